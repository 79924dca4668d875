//! Snapshot permission values
//!
//! Two spellings are accepted:
//!
//! - octal, `0o0NNN`, for example `0o0750`;
//! - symbolic, `u:<p>;g:<p>;o:<p>` where `<p>` is one of `rwx`, `rw`, `rx`,
//!   `r`, `wx`, `w`, `x` or `-`, for example `u:rx;g:rx;o:-`.
//!
//! Either way the result must grant at least one permission bit and fit in
//! `0o777`.

use crate::error::{Result, SzbckError};

const MAX_PERMISSION: u32 = 0o777;

/// Parse a permission value into a Unix mode
pub fn parse_permission(value: &str) -> Result<u32> {
    if value.starts_with("0o") {
        parse_octal(value)
    } else {
        parse_symbolic(value)
    }
}

fn parse_octal(value: &str) -> Result<u32> {
    let invalid = |reason| SzbckError::InvalidPermission {
        value: value.to_string(),
        reason,
    };

    let digits = value
        .strip_prefix("0o0")
        .ok_or_else(|| invalid("octal syntax, expected 0o0NNN"))?;
    if digits.is_empty() || !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return Err(invalid("octal syntax, expected 0o0NNN"));
    }

    let mode = u32::from_str_radix(digits, 8).map_err(|_| invalid("octal out of range"))?;
    if mode == 0 || mode > MAX_PERMISSION {
        return Err(invalid("octal out of range"));
    }

    Ok(mode)
}

fn parse_symbolic(value: &str) -> Result<u32> {
    let invalid = |reason| SzbckError::InvalidPermission {
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(invalid("no permissions"));
    }

    let groups: Vec<&str> = value.split(';').collect();
    let [user, group, other] = groups.as_slice() else {
        return Err(invalid("symbolic syntax, expected u:<p>;g:<p>;o:<p>"));
    };

    let mut mode = 0;
    for (prefix, shift, spec) in [("u:", 6, user), ("g:", 3, group), ("o:", 0, other)] {
        let bits = spec
            .strip_prefix(prefix)
            .and_then(symbolic_bits)
            .ok_or_else(|| invalid("symbolic syntax, expected u:<p>;g:<p>;o:<p>"))?;
        mode |= bits << shift;
    }

    if mode == 0 {
        return Err(invalid("no permissions"));
    }

    Ok(mode)
}

fn symbolic_bits(spec: &str) -> Option<u32> {
    match spec {
        "rwx" => Some(0o7),
        "rw" => Some(0o6),
        "rx" => Some(0o5),
        "r" => Some(0o4),
        "wx" => Some(0o3),
        "w" => Some(0o2),
        "x" => Some(0o1),
        "-" => Some(0o0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octal() {
        assert_eq!(parse_permission("0o0700").unwrap(), 0o700);
        assert_eq!(parse_permission("0o0555").unwrap(), 0o555);
        assert_eq!(parse_permission("0o01").unwrap(), 0o001);
        assert_eq!(parse_permission("0o0777").unwrap(), 0o777);
    }

    #[test]
    fn test_octal_errors() {
        for value in ["0o", "0o0", "0o700", "0o0800", "0o0+7", "0o0 7"] {
            let err = parse_permission(value).unwrap_err();
            assert!(err.to_string().contains("octal syntax"), "{value}: {err}");
        }
        for value in ["0o00", "0o01000", "0o077777777777777"] {
            let err = parse_permission(value).unwrap_err();
            assert!(err.to_string().contains("out of range"), "{value}: {err}");
        }
    }

    #[test]
    fn test_symbolic() {
        assert_eq!(parse_permission("u:rwx;g:rx;o:-").unwrap(), 0o750);
        assert_eq!(parse_permission("u:r;g:w;o:x").unwrap(), 0o421);
        assert_eq!(parse_permission("u:-;g:-;o:wx").unwrap(), 0o003);
        assert_eq!(parse_permission("u:rw;g:rw;o:rw").unwrap(), 0o666);
    }

    #[test]
    fn test_symbolic_errors() {
        let err = parse_permission("u:-;g:-;o:-").unwrap_err();
        assert!(err.to_string().contains("no permissions"), "{err}");

        let err = parse_permission("").unwrap_err();
        assert!(err.to_string().contains("no permissions"), "{err}");

        for value in [
            "u:rwx;g:rx",
            "u:rwx;g:rx;o:r;a:r",
            "g:rwx;u:rx;o:r",
            "u:xrw;g:r;o:r",
            "ux;g:r;o:r",
            "u:rwx;g:r;o:",
        ] {
            let err = parse_permission(value).unwrap_err();
            assert!(err.to_string().contains("symbolic syntax"), "{value}: {err}");
        }
    }
}
