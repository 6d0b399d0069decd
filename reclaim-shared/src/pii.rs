use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps contact details (email, phone, address) so they never leak through
/// `{:?}` or `{}` in log macros. Serialization still emits the real value
/// because API responses need it.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

/// Partially redacted email for log lines: `r***@example.com`.
pub fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, domain)
        }
        None => "********".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value_in_debug() {
        let email = Masked::new("ravi@example.com".to_string());
        assert_eq!(format!("{:?}", email), "********");
        assert_eq!(format!("{}", email), "********");
        assert_eq!(email.expose(), "ravi@example.com");
    }

    #[test]
    fn test_masked_serializes_real_value() {
        let phone = Masked::new("+91-9800000000".to_string());
        let json = serde_json::to_string(&phone).unwrap();
        assert_eq!(json, "\"+91-9800000000\"");
    }

    #[test]
    fn test_redact_email() {
        assert_eq!(redact_email("ravi@example.com"), "r***@example.com");
        assert_eq!(redact_email("not-an-email"), "********");
    }
}
