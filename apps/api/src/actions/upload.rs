//! Multipart upload parsing for the file-based actions.

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
};
use bytes::Bytes;
use tracing::debug;

use crate::errors::AppError;

/// One uploaded file, held in memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn is_image(&self) -> bool {
        match self.content_type.as_deref() {
            Some(ct) => ct.starts_with("image/"),
            None => true,
        }
    }

    /// Declared as a PDF, or carrying the PDF magic bytes.
    pub fn is_pdf(&self) -> bool {
        self.content_type.as_deref() == Some("application/pdf") || self.bytes.starts_with(b"%PDF-")
    }

    /// Content type to advertise when re-uploading; images default to PNG.
    pub fn image_content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| ct.starts_with("image/"))
            .unwrap_or("image/png")
    }
}

/// A fully-read multipart form: file parts by field name, text parts by field name.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name).filter(|f| !f.bytes.is_empty())
    }

    /// A text field, trimmed; blank values count as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(invalid_upload)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            if file_name.is_some() {
                let bytes = field.bytes().await.map_err(invalid_upload)?;
                debug!("Received upload '{name}' ({} bytes)", bytes.len());
                form.files.insert(
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    },
                );
            } else {
                let value = field.text().await.map_err(invalid_upload)?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }
}

fn invalid_upload(e: impl std::fmt::Display) -> AppError {
    debug!("Rejected multipart body: {e}");
    AppError::Validation("Invalid upload".to_string())
}

#[async_trait]
impl<S> FromRequest<S> for UploadForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(invalid_upload)?;
        UploadForm::read(multipart).await
    }
}
