// src/services/pdf.rs
//! PDF sniffing and text extraction for uploaded documents

use bytes::Bytes;
use tracing::{debug, warn};

pub const PDF_MIME: &str = "application/pdf";

/// True when the bytes carry a PDF signature, whatever the client claimed.
pub fn is_pdf(data: &[u8]) -> bool {
    infer::get(data)
        .map(|kind| kind.mime_type() == PDF_MIME)
        .unwrap_or(false)
}

/// Extracts plain text on the blocking pool. Returns `None` when the document has
/// no extractable text or the parser fails; the analysis prompt falls back to a
/// placeholder in that case.
pub async fn extract_text(data: Bytes) -> Option<String> {
    let size = data.len();
    let result =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data)).await;

    match result {
        Ok(Ok(text)) => {
            let text = text.trim().to_string();
            if text.is_empty() {
                debug!(size = size, "PDF contains no extractable text");
                None
            } else {
                debug!(size = size, chars = text.len(), "Extracted text from PDF");
                Some(text)
            }
        }
        Ok(Err(e)) => {
            warn!(error = %e, size = size, "Failed to extract text from PDF");
            None
        }
        Err(e) => {
            warn!(error = %e, "PDF extraction task failed");
            None
        }
    }
}
