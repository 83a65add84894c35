// src/services/mod.rs
//
// Collaborators consumed by the candidate and analysis modules: storage,
// mail, completion provider, pricing and PDF handling.

pub mod aws;
pub mod email;
pub mod notifications;
pub mod openai;
pub mod pdf;
pub mod pricing;
pub mod storage;

// Re-export commonly used types for convenience
pub use aws::{S3BlobStore, SesMailer};
pub use email::{LogMailer, Mailer};
pub use notifications::NotificationDispatcher;
pub use openai::{CompletionProvider, OpenAIService};
pub use pricing::{FlatSplitPricing, PricingStrategy};
pub use storage::{BlobCategory, BlobStore, LocalBlobStore};
