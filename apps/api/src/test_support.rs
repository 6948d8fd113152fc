//! In-memory fakes for every external collaborator, plus helpers for
//! driving the full router in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::session::{tests::PUBLIC_KEY, ClerkSessionVerifier};
use crate::auth::{IdentityError, IdentityProvider, IdentityUser};
use crate::config::{Config, QuotaBackend};
use crate::creations::CreationStore;
use crate::errors::AppError;
use crate::llm_client::{ChatRequest, LlmError, TextModel};
use crate::media::cloudinary::SignatureAlgorithm;
use crate::media::{ImageGenerator, MediaError, MediaStore, UploadedAsset};
use crate::models::creation::{CreationRow, NewCreation};
use crate::quota::QuotaStore;
use crate::routes::build_router;
use crate::state::AppState;

pub const FREE_USER: &str = "user_free";
pub const PREMIUM_USER: &str = "user_premium";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        gemini_api_key: "gemini".to_string(),
        gemini_base_url: "http://gemini.invalid".to_string(),
        clipdrop_api_key: "clipdrop".to_string(),
        clipdrop_base_url: "http://clipdrop.invalid".to_string(),
        cloudinary_cloud_name: "demo".to_string(),
        cloudinary_api_key: "key".to_string(),
        cloudinary_api_secret: "secret".to_string(),
        cloudinary_base_url: "http://cloudinary.invalid".to_string(),
        cloudinary_signature_algorithm: SignatureAlgorithm::Sha1,
        clerk_secret_key: "sk_test".to_string(),
        clerk_api_url: "http://clerk.invalid".to_string(),
        clerk_jwt_key: PUBLIC_KEY.to_string(),
        clerk_authorized_parties: vec![],
        quota_backend: QuotaBackend::Postgres,
        free_usage_limit: None,
        max_upload_bytes: 1024 * 1024,
        port: 0,
        rust_log: "debug".to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Identity
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeIdentity {
    users: Mutex<HashMap<String, IdentityUser>>,
    fail: bool,
    lookups: AtomicUsize,
    writes: AtomicUsize,
}

impl FakeIdentity {
    pub fn with_user(self, user_id: &str, premium: bool, free_usage: Option<u32>) -> Self {
        let public_metadata = if premium {
            json!({ "plan": "premium" })
        } else {
            json!({})
        };
        let private_metadata = match free_usage {
            Some(n) => json!({ "free_usage": n }),
            None => json!({}),
        };
        self.users.lock().unwrap().insert(
            user_id.to_string(),
            IdentityUser {
                id: user_id.to_string(),
                public_metadata,
                private_metadata,
            },
        );
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn metadata_writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn stored_free_usage(&self, user_id: &str) -> Option<u32> {
        self.users.lock().unwrap().get(user_id)?.free_usage()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn get_user(&self, user_id: &str) -> Result<IdentityUser, IdentityError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(IdentityError::Api {
                status: 503,
                message: "identity provider unavailable".to_string(),
            });
        }
        self.users
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| IdentityError::Api {
                status: 404,
                message: format!("user {user_id} not found"),
            })
    }

    async fn set_free_usage(&self, user_id: &str, free_usage: u32) -> Result<(), IdentityError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(user_id).ok_or_else(|| IdentityError::Api {
            status: 404,
            message: format!("user {user_id} not found"),
        })?;
        if !user.private_metadata.is_object() {
            user.private_metadata = json!({});
        }
        user.private_metadata["free_usage"] = json!(free_usage);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quota
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryQuota {
    counts: Mutex<HashMap<String, u32>>,
    fail: bool,
}

impl InMemoryQuota {
    /// Every call fails as if the counter table were unreachable.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_count(self, user_id: &str, count: u32) -> Self {
        self.counts.lock().unwrap().insert(user_id.to_string(), count);
        self
    }

    pub fn get(&self, user_id: &str) -> Option<u32> {
        self.counts.lock().unwrap().get(user_id).copied()
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuota {
    async fn current_or_init(&self, user_id: &str) -> Result<u32, AppError> {
        if self.fail {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(*self
            .counts
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_insert(0))
    }

    async fn increment(&self, user_id: &str) -> Result<u32, AppError> {
        if self.fail {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(user_id.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Language model
// ────────────────────────────────────────────────────────────────────────────

pub struct FakeTextModel {
    reply: Option<String>,
    chats: Mutex<Vec<ChatRequest>>,
    generations: Mutex<Vec<String>>,
}

impl FakeTextModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            chats: Mutex::new(Vec::new()),
            generations: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `EmptyContent`.
    pub fn empty() -> Self {
        Self {
            reply: None,
            chats: Mutex::new(Vec::new()),
            generations: Mutex::new(Vec::new()),
        }
    }

    pub fn chats(&self) -> Vec<ChatRequest> {
        self.chats.lock().unwrap().clone()
    }

    pub fn generations(&self) -> Vec<String> {
        self.generations.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.chats.lock().unwrap().len() + self.generations.lock().unwrap().len()
    }
}

#[async_trait]
impl TextModel for FakeTextModel {
    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        self.chats.lock().unwrap().push(request);
        self.reply.clone().ok_or(LlmError::EmptyContent)
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.generations.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or(LlmError::EmptyContent)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Media
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeImageGenerator {
    prompts: Mutex<Vec<String>>,
}

impl FakeImageGenerator {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<Bytes, MediaError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(Bytes::from_static(b"\x89PNG"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub data_uri: String,
    pub transformation: Option<String>,
}

#[derive(Default)]
pub struct FakeMediaStore {
    uploads: Mutex<Vec<RecordedUpload>>,
    fail: bool,
}

impl FakeMediaStore {
    pub fn failing() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for FakeMediaStore {
    async fn upload(
        &self,
        data_uri: String,
        transformation: Option<String>,
    ) -> Result<UploadedAsset, MediaError> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(RecordedUpload {
            data_uri,
            transformation,
        });
        if self.fail {
            return Err(MediaError::Api {
                service: "Cloudinary",
                status: 500,
                message: "internal storage failure at node cld-7".to_string(),
            });
        }
        let public_id = format!("asset{}", uploads.len());
        Ok(UploadedAsset {
            secure_url: format!("https://media.test/{public_id}.png"),
            public_id,
        })
    }

    fn transformed_url(&self, public_id: &str, effect: &str) -> Result<String, MediaError> {
        Ok(format!("https://media.test/e_{effect}/{public_id}"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Creations
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryCreations {
    rows: Mutex<Vec<CreationRow>>,
}

impl InMemoryCreations {
    pub fn rows(&self) -> Vec<CreationRow> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl CreationStore for InMemoryCreations {
    async fn insert(&self, creation: &NewCreation) -> Result<(), AppError> {
        self.rows.lock().unwrap().push(CreationRow {
            id: Uuid::new_v4(),
            user_id: creation.user_id.clone(),
            prompt: creation.prompt.clone(),
            content: creation.content.clone(),
            kind: creation.kind.as_str().to_string(),
            publish: creation.publish,
            created_at: chrono::Utc::now(),
        });
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<CreationRow>, AppError> {
        Ok(self
            .rows()
            .into_iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .collect())
    }

    async fn list_published(&self) -> Result<Vec<CreationRow>, AppError> {
        Ok(self.rows().into_iter().rev().filter(|r| r.publish).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// App harness
// ────────────────────────────────────────────────────────────────────────────

pub struct TestApp {
    pub identity: Arc<FakeIdentity>,
    pub quota: Arc<InMemoryQuota>,
    pub llm: Arc<FakeTextModel>,
    pub images: Arc<FakeImageGenerator>,
    pub media: Arc<FakeMediaStore>,
    pub creations: Arc<InMemoryCreations>,
    pub config: Config,
}

impl TestApp {
    /// A free user with no counter yet and a premium user, both known to the
    /// identity provider; the model answers with `reply`.
    pub fn new(reply: &str) -> Self {
        Self::with_model(FakeTextModel::replying(reply))
    }

    pub fn with_model(llm: FakeTextModel) -> Self {
        Self {
            identity: Arc::new(
                FakeIdentity::default()
                    .with_user(FREE_USER, false, None)
                    .with_user(PREMIUM_USER, true, None),
            ),
            quota: Arc::new(InMemoryQuota::default()),
            llm: Arc::new(llm),
            images: Arc::new(FakeImageGenerator::default()),
            media: Arc::new(FakeMediaStore::default()),
            creations: Arc::new(InMemoryCreations::default()),
            config: test_config(),
        }
    }

    pub fn router(&self) -> Router {
        let sessions = ClerkSessionVerifier::from_pem(PUBLIC_KEY, vec![]).unwrap();
        build_router(AppState {
            config: self.config.clone(),
            sessions: Arc::new(sessions),
            identity: self.identity.clone(),
            quota: self.quota.clone(),
            llm: self.llm.clone(),
            images: self.images.clone(),
            media: self.media.clone(),
            creations: self.creations.clone(),
        })
    }

    /// Calls made to the model, image generator and media store combined.
    pub fn external_calls(&self) -> usize {
        self.llm.calls() + self.images.prompts().len() + self.media.uploads().len()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

pub fn bearer(user_id: &str) -> String {
    format!("Bearer {}", crate::auth::session::tests::token_for(user_id))
}

pub fn json_post(path: &str, user_id: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::AUTHORIZATION, bearer(user_id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(path: &str, user_id: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::AUTHORIZATION, bearer(user_id))
        .body(Body::empty())
        .unwrap()
}

/// One multipart part: `(field name, optional (file name, content type), bytes)`.
pub type Part<'a> = (&'a str, Option<(&'a str, &'a str)>, &'a [u8]);

const BOUNDARY: &str = "----studio-test-boundary";

pub fn multipart_post(path: &str, user_id: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, file, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file {
            Some((file_name, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::AUTHORIZATION, bearer(user_id))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
