//! External user identifier codec.
//!
//! Users are addressed externally as `u<digits>` (e.g. `u42`) and stored under
//! the numeric part. All format assumptions live here.

use crate::error::AppError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Prefix every external user id carries.
const PREFIX: char = 'u';

/// Internal numeric key of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(i64);

impl UserId {
    pub fn new(key: i64) -> Self {
        Self(key)
    }

    /// The numeric key used as the `users.user_id` column.
    pub fn key(self) -> i64 {
        self.0
    }
}

impl From<i64> for UserId {
    fn from(key: i64) -> Self {
        Self(key)
    }
}

impl FromStr for UserId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(PREFIX)
            .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| AppError::invalid_identifier(s))?;

        digits
            .parse::<i64>()
            .map(Self)
            .map_err(|_| AppError::invalid_identifier(s))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, self.0)
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a required external id: blank is `Required`, malformed is `InvalidIdentifier`.
pub fn parse_required(value: &str, field: &str) -> Result<UserId, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::required(field));
    }
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_ids() {
        assert_eq!("u1".parse::<UserId>().unwrap(), UserId::new(1));
        assert_eq!("u0042".parse::<UserId>().unwrap(), UserId::new(42));
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        for bad in ["", "u", "1", "U1", "u-1", "u+1", "u1a", "user1", " u1", "u99999999999999999999"] {
            let err = bad.parse::<UserId>().unwrap_err();
            assert!(
                matches!(err, AppError::InvalidIdentifier { ref value } if value == bad),
                "{bad:?} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_display_and_serialize() {
        let id = UserId::new(7);
        assert_eq!(id.to_string(), "u7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u7\"");
    }

    #[test]
    fn test_parse_required() {
        assert!(matches!(
            parse_required("  ", "user_id"),
            Err(AppError::Required { ref field }) if field == "user_id"
        ));
        assert!(matches!(
            parse_required("x9", "user_id"),
            Err(AppError::InvalidIdentifier { .. })
        ));
        assert_eq!(parse_required(" u9 ", "user_id").unwrap(), UserId::new(9));
    }
}
