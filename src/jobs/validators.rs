// src/jobs/validators.rs

use super::models::*;
use crate::common::validation::{check_required, is_valid_email};
use crate::common::{ValidationResult, Validator};
use chrono::{NaiveDate, Utc};

// ============================================================================
// Job Offer Validators
// ============================================================================

/// Deadlines are compared against `today`, injected so tests can pin it.
pub struct JobOfferValidator {
    pub today: NaiveDate,
}

impl JobOfferValidator {
    pub fn new() -> Self {
        Self {
            today: Utc::now().date_naive(),
        }
    }
}

impl Default for JobOfferValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn check_offer_type(result: &mut ValidationResult, value: &str) {
    if normalize_offer_type(value).is_none() {
        result.add_error("type", "The type must be one of: emploi, stage");
    }
}

fn check_in(result: &mut ValidationResult, field: &str, value: &str, allowed: &[&str]) {
    if !allowed.contains(&value) {
        result.add_error(
            field,
            &format!("The {} must be one of: {}", field, allowed.join(", ")),
        );
    }
}

fn check_deadline(result: &mut ValidationResult, value: &str, today: NaiveDate) {
    match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
        Ok(date) if date > today => {}
        Ok(_) => result.add_error(
            "application_deadline",
            "The application deadline must be a date after today",
        ),
        Err(_) => result.add_error(
            "application_deadline",
            "The application deadline must be a date (YYYY-MM-DD)",
        ),
    }
}

fn check_optional_fields(
    result: &mut ValidationResult,
    positions_available: Option<i64>,
    contact_email: Option<&str>,
    salary_range: Option<&str>,
    skills_required: Option<&Vec<String>>,
) {
    if let Some(positions) = positions_available {
        if positions < 1 {
            result.add_error(
                "positions_available",
                "At least one position must be available",
            );
        }
    }

    if let Some(email) = contact_email {
        if !email.trim().is_empty() && !is_valid_email(email) {
            result.add_error("contact_email", "The contact email must be a valid email address");
        }
    }

    if let Some(salary) = salary_range {
        if salary.chars().count() > 255 {
            result.add_error("salary_range", "The salary range must not exceed 255 characters");
        }
    }

    if let Some(skills) = skills_required {
        if skills.iter().any(|s| s.trim().is_empty()) {
            result.add_error("skills_required", "Skills must not be blank");
        }
    }
}

impl Validator<CreateJobOffer> for JobOfferValidator {
    fn validate(&self, data: &CreateJobOffer) -> ValidationResult {
        let mut result = ValidationResult::new();

        check_required(&mut result, "title", &data.title, 255);
        check_offer_type(&mut result, &data.offer_type);
        check_required(&mut result, "description", &data.description, 20_000);
        check_required(&mut result, "requirements", &data.requirements, 20_000);
        check_required(&mut result, "location", &data.location, 255);
        check_in(&mut result, "contract_type", &data.contract_type, &CONTRACT_TYPES);
        check_required(&mut result, "company_name", &data.company_name, 255);
        check_in(
            &mut result,
            "experience_level",
            &data.experience_level,
            &EXPERIENCE_LEVELS,
        );

        if let Some(deadline) = &data.application_deadline {
            check_deadline(&mut result, deadline, self.today);
        }

        if let Some(status) = &data.status {
            check_in(&mut result, "status", status, &OFFER_STATUSES);
        }

        check_optional_fields(
            &mut result,
            data.positions_available,
            data.contact_email.as_deref(),
            data.salary_range.as_deref(),
            data.skills_required.as_ref(),
        );

        result
    }
}

impl Validator<UpdateJobOffer> for JobOfferValidator {
    fn validate(&self, data: &UpdateJobOffer) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(title) = &data.title {
            check_required(&mut result, "title", title, 255);
        }
        if let Some(offer_type) = &data.offer_type {
            check_offer_type(&mut result, offer_type);
        }
        if let Some(description) = &data.description {
            check_required(&mut result, "description", description, 20_000);
        }
        if let Some(requirements) = &data.requirements {
            check_required(&mut result, "requirements", requirements, 20_000);
        }
        if let Some(location) = &data.location {
            check_required(&mut result, "location", location, 255);
        }
        if let Some(contract_type) = &data.contract_type {
            check_in(&mut result, "contract_type", contract_type, &CONTRACT_TYPES);
        }
        if let Some(company_name) = &data.company_name {
            check_required(&mut result, "company_name", company_name, 255);
        }
        if let Some(level) = &data.experience_level {
            check_in(&mut result, "experience_level", level, &EXPERIENCE_LEVELS);
        }
        if let Some(deadline) = &data.application_deadline {
            check_deadline(&mut result, deadline, self.today);
        }
        if let Some(status) = &data.status {
            check_in(&mut result, "status", status, &OFFER_STATUSES);
        }

        check_optional_fields(
            &mut result,
            data.positions_available,
            data.contact_email.as_deref(),
            data.salary_range.as_deref(),
            data.skills_required.as_ref(),
        );

        result
    }
}
