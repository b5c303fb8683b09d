//! # Try-On Image Generation
//!
//! Character images are produced by an external try-on service. The
//! [`ImageGenerator`] trait is the seam; [`HttpImageGenerator`] posts the
//! request as JSON and returns the response body as the image bytes.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::extractors::Validate;

/// How the garment image was photographed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum GarmentPhotoType {
    #[default]
    Auto,
    FlatLay,
    Model,
}

/// Quality and processing options forwarded to the try-on service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub struct TryOnRequest {
    /// 1.5 to 3.0.
    pub guidance_scale: f64,
    /// 10 to 50.
    pub timesteps: u32,
    /// 1 to 4.
    pub num_samples: u32,
    pub seed: i64,
    pub nsfw_filter: bool,
    pub cover_feet: bool,
    pub adjust_hands: bool,
    pub restore_background: bool,
    pub restore_clothes: bool,
    pub garment_photo_type: GarmentPhotoType,
    pub long_top: bool,
}

impl Default for TryOnRequest {
    fn default() -> Self {
        Self {
            guidance_scale: 2.0,
            timesteps: 50,
            num_samples: 1,
            seed: 42,
            nsfw_filter: true,
            cover_feet: false,
            adjust_hands: false,
            restore_background: false,
            restore_clothes: false,
            garment_photo_type: GarmentPhotoType::Auto,
            long_top: false,
        }
    }
}

impl Validate for TryOnRequest {
    fn validate(&self) -> Result<(), String> {
        if !(1.5..=3.0).contains(&self.guidance_scale) {
            return Err(format!(
                "guidance_scale must be between 1.5 and 3.0, got {}",
                self.guidance_scale
            ));
        }
        if !(10..=50).contains(&self.timesteps) {
            return Err(format!(
                "timesteps must be between 10 and 50, got {}",
                self.timesteps
            ));
        }
        if !(1..=4).contains(&self.num_samples) {
            return Err(format!(
                "num_samples must be between 1 and 4, got {}",
                self.num_samples
            ));
        }
        Ok(())
    }
}

/// Everything the try-on service needs to render one character.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationInput {
    /// Storage path of the source character image.
    pub character: String,
    /// Storage path of the garment to apply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub garment: Option<String>,
    pub gender: String,
    pub parameters: TryOnRequest,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("try-on request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("try-on service returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("try-on service returned an empty image")]
    Empty,
}

/// Produces a rendered character image.
#[async_trait]
pub trait ImageGenerator: Send + Sync + std::fmt::Debug {
    async fn generate(&self, input: &GenerationInput) -> Result<Vec<u8>, GenerationError>;
}

/// Calls the try-on service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpImageGenerator {
    http: reqwest::Client,
    url: String,
}

impl HttpImageGenerator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(&self, input: &GenerationInput) -> Result<Vec<u8>, GenerationError> {
        let resp = self.http.post(&self.url).json(input).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream { status, body });
        }
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(GenerationError::Empty);
        }
        tracing::info!(character = %input.character, size = bytes.len(), "try-on image generated");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn input() -> GenerationInput {
        GenerationInput {
            character: "chars/a.png".into(),
            garment: Some("recs/tops/shirt.png".into()),
            gender: "woman".into(),
            parameters: TryOnRequest::default(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(TryOnRequest::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut req = TryOnRequest {
            guidance_scale: 3.5,
            ..Default::default()
        };
        assert!(req.validate().unwrap_err().contains("guidance_scale"));
        req.guidance_scale = 1.5;
        req.timesteps = 9;
        assert!(req.validate().unwrap_err().contains("timesteps"));
        req.timesteps = 10;
        req.num_samples = 5;
        assert!(req.validate().unwrap_err().contains("num_samples"));
        req.num_samples = 4;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let req: TryOnRequest =
            serde_json::from_str(r#"{"seed": 7, "garment_photo_type": "flat-lay"}"#).unwrap();
        assert_eq!(req.seed, 7);
        assert_eq!(req.garment_photo_type, GarmentPhotoType::FlatLay);
        assert_eq!(req.timesteps, 50);
        assert!(req.nsfw_filter);
    }

    #[tokio::test]
    async fn http_generator_posts_input_and_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(body_partial_json(serde_json::json!({
                "character": "chars/a.png",
                "garment": "recs/tops/shirt.png",
                "parameters": {"timesteps": 50, "garment_photo_type": "auto"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
            .expect(1)
            .mount(&server)
            .await;

        let generator =
            HttpImageGenerator::new(format!("{}/generate", server.uri()), Duration::from_secs(5))
                .unwrap();
        assert_eq!(generator.generate(&input()).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn http_generator_reports_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("gpu offline"))
            .mount(&server)
            .await;

        let generator = HttpImageGenerator::new(server.uri(), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            generator.generate(&input()).await,
            Err(GenerationError::Upstream { status: 502, .. })
        ));
    }
}
