use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// What kind of output a creation row records. Stored as text in `creations.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreationType {
    #[serde(rename = "article")]
    Article,
    #[serde(rename = "blog-article")]
    BlogArticle,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "resume-review")]
    ResumeReview,
}

impl CreationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreationType::Article => "article",
            CreationType::BlogArticle => "blog-article",
            CreationType::Image => "image",
            CreationType::ResumeReview => "resume-review",
        }
    }
}

/// A creation about to be appended. Rows are never updated or deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCreation {
    pub user_id: String,
    pub prompt: String,
    pub content: String,
    pub kind: CreationType,
    pub publish: bool,
}

impl NewCreation {
    pub fn new(user_id: &str, prompt: impl Into<String>, content: impl Into<String>, kind: CreationType) -> Self {
        Self {
            user_id: user_id.to_string(),
            prompt: prompt.into(),
            content: content.into(),
            kind,
            publish: false,
        }
    }

    pub fn published(mut self, publish: bool) -> Self {
        self.publish = publish;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreationRow {
    pub id: Uuid,
    pub user_id: String,
    pub prompt: String,
    pub content: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub publish: bool,
    pub created_at: DateTime<Utc>,
}
