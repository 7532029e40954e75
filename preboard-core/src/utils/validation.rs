use regex::Regex;
use std::sync::LazyLock;

const MAX_EMAIL_LENGTH: usize = 254;

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)+$")
        .expect("email pattern compiles")
});

/// Syntactic email check. Deliverability is the mail provider's problem.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LENGTH && EMAIL_RE.is_match(email)
}

/// Trim and lowercase an email address for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Trim an optional free-text field, mapping blank input to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("jane.doe+founder@mail.example.co"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("jane"));
        assert!(!is_valid_email("jane@"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("jane doe@example.com"));
        assert!(!is_valid_email(&format!("{}@example.com", "a".repeat(250))));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" x ".into())), Some("x".into()));
        assert_eq!(non_blank(None), None);
    }
}
