//! Text extraction from uploaded documents.

use bytes::Bytes;
use tracing::warn;

use crate::errors::AppError;

const UNREADABLE_PDF: &str = "Unable to read the uploaded PDF";

/// Extracts the text layer of a PDF.
///
/// Parsing runs on the blocking pool; a malformed file (including one that
/// makes the parser panic) is reported as a validation error.
pub async fn extract_pdf_text(pdf: Bytes) -> Result<String, AppError> {
    let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
        .await
        .map_err(|e| {
            warn!("PDF extraction task failed: {e}");
            AppError::Validation(UNREADABLE_PDF.to_string())
        })?;

    let text = extracted.map_err(|e| {
        warn!("PDF extraction failed: {e}");
        AppError::Validation(UNREADABLE_PDF.to_string())
    })?;

    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation(
            "No readable text found in the uploaded PDF".to_string(),
        ));
    }
    Ok(text.to_string())
}
