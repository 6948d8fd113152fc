pub const DEFAULT_ARTICLE_LENGTH: u32 = 800;
const ARTICLE_MAX_TOKENS_CAP: u32 = 1600;
pub const TITLE_MAX_TOKENS: u32 = 1200;
pub const TEMPERATURE: f32 = 0.7;

pub const ARTICLE_PROMPT_TEMPLATE: &str = r#"
Write a full article about: "{prompt}".
Approximate length: {length} words.
Use headings, paragraphs, and markdown formatting.
"#;

pub const RESUME_REVIEW_PROMPT_TEMPLATE: &str = "Review this resume: {resume_text}";

pub const BACKGROUND_REMOVAL_PROMPT: &str = "Remove background from image";
pub const RESUME_REVIEW_PROMPT: &str = "Resume Review";

pub fn article_prompt(prompt: &str, length: u32) -> String {
    ARTICLE_PROMPT_TEMPLATE
        .replace("{prompt}", prompt)
        .replace("{length}", &length.to_string())
}

/// Two tokens per requested word, capped.
pub fn article_max_tokens(length: u32) -> u32 {
    length.saturating_mul(2).min(ARTICLE_MAX_TOKENS_CAP)
}

pub fn resume_review_prompt(resume_text: &str) -> String {
    RESUME_REVIEW_PROMPT_TEMPLATE.replace("{resume_text}", resume_text)
}

pub fn object_removal_prompt(object: &str) -> String {
    format!("Removed {object} from image")
}
