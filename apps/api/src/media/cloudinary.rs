use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{multipart::Form, Client};
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use super::{MediaError, MediaStore, UploadedAsset};

const SERVICE: &str = "Cloudinary";
const DELIVERY_BASE_URL: &str = "https://res.cloudinary.com";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryError {
    error: CloudinaryErrorBody,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    message: String,
}

/// Hash used for upload signatures. Must match the product environment's
/// signature setting; Cloudinary defaults to SHA-1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl std::str::FromStr for SignatureAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(SignatureAlgorithm::Sha1),
            "sha256" => Ok(SignatureAlgorithm::Sha256),
            other => anyhow::bail!(
                "Unknown CLOUDINARY_SIGNATURE_ALGORITHM '{other}' (expected 'sha1' or 'sha256')"
            ),
        }
    }
}

/// Signed-upload client for a single Cloudinary product environment.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    base_url: String,
    algorithm: SignatureAlgorithm,
}

impl CloudinaryClient {
    pub fn new(
        client: Client,
        cloud_name: String,
        api_key: String,
        api_secret: String,
        base_url: &str,
    ) -> Self {
        Self {
            client,
            cloud_name,
            api_key,
            api_secret,
            base_url: base_url.trim_end_matches('/').to_string(),
            algorithm: SignatureAlgorithm::default(),
        }
    }

    pub fn with_signature_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/// Signature over the signed parameters: `k=v` pairs sorted by key, joined by
/// `&`, with the API secret appended, hex digest.
pub fn sign_params(
    params: &BTreeMap<&str, String>,
    api_secret: &str,
    algorithm: SignatureAlgorithm,
) -> String {
    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    match algorithm {
        SignatureAlgorithm::Sha1 => hex_digest::<Sha1>(&joined, api_secret),
        SignatureAlgorithm::Sha256 => hex_digest::<Sha256>(&joined, api_secret),
    }
}

fn hex_digest<D: Digest>(joined: &str, api_secret: &str) -> String {
    let mut hasher = D::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaStore for CloudinaryClient {
    async fn upload(
        &self,
        data_uri: String,
        transformation: Option<String>,
    ) -> Result<UploadedAsset, MediaError> {
        let mut signed: BTreeMap<&str, String> = BTreeMap::new();
        signed.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        if let Some(t) = transformation {
            signed.insert("transformation", t);
        }
        let signature = sign_params(&signed, &self.api_secret, self.algorithm);

        let mut form = Form::new()
            .text("file", data_uri)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);
        for (k, v) in signed {
            form = form.text(k, v);
        }

        let response = self
            .client
            .post(format!(
                "{}/v1_1/{}/image/upload",
                self.base_url, self.cloud_name
            ))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<CloudinaryError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(MediaError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadResponse = response.json().await?;
        info!("Uploaded asset {} to Cloudinary", uploaded.public_id);
        Ok(UploadedAsset {
            secure_url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    fn transformed_url(&self, public_id: &str, effect: &str) -> Result<String, MediaError> {
        let mut url = Url::parse(DELIVERY_BASE_URL)?;
        url.path_segments_mut()
            .map_err(|_| MediaError::DeliveryUrl(DELIVERY_BASE_URL.to_string()))?
            .pop_if_empty()
            .extend([self.cloud_name.as_str(), "image", "upload"])
            .push(&format!("e_{}", effect.trim()))
            .extend(public_id.split('/'));
        debug!("Built transformed url {url}");
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> CloudinaryClient {
        CloudinaryClient::new(
            Client::new(),
            "demo".to_string(),
            "1234".to_string(),
            "abcd".to_string(),
            base_url,
        )
    }

    #[test]
    fn test_signature_matches_documented_sha1_example() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample_image".to_string());
        params.insert("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string());
        assert_eq!(
            sign_params(&params, "abcd", SignatureAlgorithm::Sha1),
            "bfd09f95f331f558cbd1320e67aa8d488770583e"
        );
    }

    #[test]
    fn test_signature_sorts_params_and_appends_secret() {
        let mut params = BTreeMap::new();
        params.insert("transformation", "e_background_removal".to_string());
        params.insert("timestamp", "1315060510".to_string());
        assert_eq!(
            sign_params(&params, "abcd", SignatureAlgorithm::Sha1),
            "728542f918ccce7f4d9825752539e80822b73263"
        );
        assert_eq!(
            sign_params(&params, "abcd", SignatureAlgorithm::Sha256),
            "3bcb3fb8334545955268cb8307781eda81b5472684e31a80c0ee91a761f7671c"
        );
    }

    #[test]
    fn test_signature_timestamp_only() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        assert_eq!(
            sign_params(&params, "abcd", SignatureAlgorithm::Sha1),
            "a21ad0f63beb4de2e5575204b79ab90bffb02c10"
        );
    }

    #[test]
    fn test_signature_algorithm_parse() {
        assert_eq!(SignatureAlgorithm::default(), SignatureAlgorithm::Sha1);
        assert_eq!("SHA256".parse::<SignatureAlgorithm>().unwrap(), SignatureAlgorithm::Sha256);
        assert_eq!("sha-1".parse::<SignatureAlgorithm>().unwrap(), SignatureAlgorithm::Sha1);
        assert!("md5".parse::<SignatureAlgorithm>().is_err());
    }

    #[test]
    fn test_transformed_url_escapes_label() {
        let url = client("http://unused")
            .transformed_url("samples/dog", "gen_remove:red car")
            .unwrap();
        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/image/upload/e_gen_remove:red%20car/samples/dog"
        );
    }

    #[test]
    fn test_transformed_url_keeps_label_in_one_segment() {
        let url = client("http://unused")
            .transformed_url("abc123", "gen_remove:cat/dog?#")
            .unwrap();
        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/image/upload/e_gen_remove:cat%2Fdog%3F%23/abc123"
        );
    }

    #[tokio::test]
    async fn test_upload_sends_signed_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "public_id": "abc123",
                "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/abc123.png"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let asset = client(&server.uri())
            .upload(
                "data:image/png;base64,cG5n".to_string(),
                Some("e_background_removal".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(asset.public_id, "abc123");
        assert!(asset.secure_url.ends_with("abc123.png"));

        let received = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&received[0].body);
        for field in ["file", "api_key", "timestamp", "signature", "transformation"] {
            assert!(body.contains(&format!("name=\"{field}\"")), "missing {field}");
        }
    }

    #[tokio::test]
    async fn test_upload_error_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/upload"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Invalid Signature" }
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .upload("data:image/png;base64,cG5n".to_string(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MediaError::Api { status: 401, ref message, .. } if message == "Invalid Signature"
        ));
    }
}
