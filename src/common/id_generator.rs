// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXX (e.g., A_K7NP3X for an application)
//!
//! The alphabet excludes I, L, O and U so ids can be read back over the phone.

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of the random part of stored file names.
const UPLOAD_NAME_LENGTH: usize = 16;

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// Job offer (J_)
    JobOffer,
    /// Applicant (C_) - C for Candidate
    Applicant,
    /// Application (A_)
    Application,
    /// CV analysis (CV_)
    Analysis,
    /// AI provider call log (L_)
    ProcessingLog,
}

impl EntityPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::JobOffer => "J",
            EntityPrefix::Applicant => "C",
            EntityPrefix::Application => "A",
            EntityPrefix::Analysis => "CV",
            EntityPrefix::ProcessingLog => "L",
        }
    }
}

fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Returns "PREFIX_XXXXXX" (e.g. "J_K7NP3X").
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(6))
}

/// Random file stem for an uploaded document. Uploads are never deduplicated,
/// so the name only has to be unlikely to collide.
pub fn generate_upload_name() -> String {
    generate_crockford_string(UPLOAD_NAME_LENGTH)
}

// ============================================================================
// Convenience functions for each entity type
// ============================================================================

pub fn generate_job_offer_id() -> String {
    generate_id(EntityPrefix::JobOffer)
}

pub fn generate_applicant_id() -> String {
    generate_id(EntityPrefix::Applicant)
}

pub fn generate_application_id() -> String {
    generate_id(EntityPrefix::Application)
}

pub fn generate_analysis_id() -> String {
    generate_id(EntityPrefix::Analysis)
}

pub fn generate_processing_log_id() -> String {
    generate_id(EntityPrefix::ProcessingLog)
}
