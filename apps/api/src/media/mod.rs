//! Image generation and hosted media storage.
//!
//! Both services sit behind traits so the action handlers never see a
//! vendor client directly. `AppState` carries `Arc<dyn ImageGenerator>` and
//! `Arc<dyn MediaStore>`.

pub mod clipdrop;
pub mod cloudinary;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API error (status {status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} returned an empty response")]
    Empty { service: &'static str },

    #[error("Invalid delivery URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Delivery URL {0} cannot take path segments")]
    DeliveryUrl(String),
}

/// A stored asset as reported by the media store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub secure_url: String,
    pub public_id: String,
}

/// Text-to-image synthesis.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the encoded PNG produced for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<Bytes, MediaError>;
}

/// Hosted storage with on-the-fly image transformations.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Uploads a data URI, applying `transformation` (e.g. `e_background_removal`)
    /// to the stored asset when given.
    async fn upload(
        &self,
        data_uri: String,
        transformation: Option<String>,
    ) -> Result<UploadedAsset, MediaError>;

    /// Delivery URL for `public_id` with a single `effect` applied at read time.
    /// The effect is kept in a single path segment, so free text is escaped.
    fn transformed_url(&self, public_id: &str, effect: &str) -> Result<String, MediaError>;
}

/// Encodes raw file bytes as a `data:` URI suitable for upload.
pub fn to_data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{content_type};base64,{}", STANDARD.encode(bytes))
}

pub fn to_png_data_uri(bytes: &[u8]) -> String {
    to_data_uri("image/png", bytes)
}
