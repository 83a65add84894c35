// Helper functions for safe logging, timestamps and JSON list columns

use serde::{Serialize, Serializer};

/// Masks email addresses for safe logging
///
/// # Example
/// ```ignore
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 {
            let first = parts[0].chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Current time as stored in every timestamp column.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Parses a JSON array column, treating NULL or garbage as empty.
pub fn parse_json_list(raw: Option<&str>) -> Vec<serde_json::Value> {
    raw.and_then(|r| serde_json::from_str::<Vec<serde_json::Value>>(r).ok())
        .unwrap_or_default()
}

/// Serializes a JSON text column as an array in API responses
pub fn serialize_json_list<S>(raw: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match raw {
        Some(_) => parse_json_list(raw.as_deref()).serialize(serializer),
        None => serializer.serialize_none(),
    }
}

/// Serializes a JSON text column as the JSON it holds, or as a string when it
/// does not parse.
pub fn serialize_json_text<S>(raw: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match raw {
        Some(text) => match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => value.serialize(serializer),
            Err(_) => serializer.serialize_str(text),
        },
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_email_log_masks_local_part() {
        assert_eq!(safe_email_log("jean@x.com"), "j***@x.com");
        assert_eq!(safe_email_log("abc"), "***@***.***");
        assert_eq!(safe_email_log("no-at-sign"), "***@***.***");
    }

    #[test]
    fn test_parse_json_list_is_lenient() {
        assert_eq!(parse_json_list(Some(r#"["Rust","SQL"]"#)).len(), 2);
        assert!(parse_json_list(Some("not json")).is_empty());
        assert!(parse_json_list(None).is_empty());
    }
}
