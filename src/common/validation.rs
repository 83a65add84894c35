// Common validation types and traits

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Every failing field of one request, in the order the checks ran.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.is_valid {
            self.is_valid = false;
            self.errors.extend(other.errors);
        }
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Groups messages by field: `{"email": ["...", "..."], "cv_file": ["..."]}`.
    pub fn to_field_map(&self) -> Value {
        let mut map = Map::new();
        for error in &self.errors {
            let entry = map
                .entry(error.field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(messages) = entry {
                messages.push(Value::String(error.message.clone()));
            }
        }
        Value::Object(map)
    }

    pub fn into_result(self) -> Result<(), ValidationResult> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").ok()
        })
        .as_ref()
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().map_or(false, |re| re.is_match(email.trim()))
}

pub fn is_valid_http_url(url: &str) -> bool {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split('/').next().unwrap_or("");
            host.contains('.') && !host.contains(' ')
        }
        None => false,
    }
}

/// Required, non-blank and at most `max` characters.
pub fn check_required(result: &mut ValidationResult, field: &str, value: &str, max: usize) {
    if value.trim().is_empty() {
        result.add_error(field, &format!("The {} field is required", field));
    } else if value.chars().count() > max {
        result.add_error(
            field,
            &format!("The {} field must not exceed {} characters", field, max),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_map_groups_messages() {
        let mut result = ValidationResult::new();
        result.add_error("email", "The email field is required");
        result.add_error("cv_file", "The CV must be a PDF file");
        result.add_error("cv_file", "The CV must not exceed 10 MB");

        let map = result.to_field_map();
        assert_eq!(map["email"].as_array().map(|a| a.len()), Some(1));
        assert_eq!(map["cv_file"].as_array().map(|a| a.len()), Some(2));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_merge_keeps_all_errors() {
        let mut first = ValidationResult::new();
        first.add_error("nom", "required");
        let mut second = ValidationResult::new();
        second.add_error("prenom", "required");

        first.merge(second);
        assert_eq!(first.errors.len(), 2);
        assert!(first.has_error("nom"));
        assert!(first.has_error("prenom"));
    }

    #[test]
    fn test_email_and_url_checks() {
        assert!(is_valid_email("jean@x.com"));
        assert!(is_valid_email("jean.dupont+cv@mail.example.fr"));
        assert!(!is_valid_email("jean@"));
        assert!(!is_valid_email("not-an-email"));

        assert!(is_valid_http_url("https://www.linkedin.com/in/jean"));
        assert!(!is_valid_http_url("linkedin.com/in/jean"));
        assert!(!is_valid_http_url("ftp://files.example.com"));
    }

    #[test]
    fn test_check_required_limits() {
        let mut result = ValidationResult::new();
        check_required(&mut result, "telephone", "   ", 20);
        check_required(&mut result, "nom", &"x".repeat(256), 255);
        check_required(&mut result, "prenom", "Jean", 255);
        assert!(result.has_error("telephone"));
        assert!(result.has_error("nom"));
        assert!(!result.has_error("prenom"));
    }
}
