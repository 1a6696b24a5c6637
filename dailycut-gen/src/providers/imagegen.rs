//! Image generation tiers (album artwork)
//!
//! Two tiers, Gemini Imagen → OpenAI Images, both returning raw image
//! bytes decoded from base64 payloads. Artwork exhaustion never fails
//! a pipeline - the album lifecycle falls back to default artwork.

use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use std::time::Duration;

use crate::executor::{ProviderError, ProviderTier};

use super::ArtworkPromptInput;

const GEMINI_PREDICT_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/imagen-3.0-generate-001:predict";
const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
const OPENAI_IMAGE_MODEL: &str = "dall-e-3";
const HTTP_TIMEOUT_SECS: u64 = 60;

fn build_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|e| ProviderError::Network(e.to_string()))
}

fn decode_b64(data: &str) -> Result<Vec<u8>, ProviderError> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| ProviderError::Malformed(format!("invalid base64 image: {}", e)))
}

// ============================================================================
// Gemini Imagen - primary
// ============================================================================

pub struct GeminiImageGen {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiImageGen {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Ok(Self { client: build_client()?, api_key })
    }
}

#[async_trait]
impl ProviderTier<ArtworkPromptInput, Vec<u8>> for GeminiImageGen {
    fn name(&self) -> &str {
        "gemini_imagen"
    }

    async fn call(&self, input: &ArtworkPromptInput) -> Result<Vec<u8>, ProviderError> {
        let body = json!({
            "instances": [{"prompt": input.prompt}],
            "parameters": {"sampleCount": 1, "aspectRatio": "1:1"},
        });

        let response = self
            .client
            .post(GEMINI_PREDICT_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), body));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let encoded = parsed["predictions"][0]["bytesBase64Encoded"]
            .as_str()
            .ok_or_else(|| ProviderError::Malformed("no prediction bytes".to_string()))?;

        decode_b64(encoded)
    }
}

// ============================================================================
// OpenAI Images - fallback
// ============================================================================

pub struct OpenAiImageGen {
    client: reqwest::Client,
    api_key: String,
}

impl OpenAiImageGen {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Ok(Self { client: build_client()?, api_key })
    }
}

#[async_trait]
impl ProviderTier<ArtworkPromptInput, Vec<u8>> for OpenAiImageGen {
    fn name(&self) -> &str {
        "openai_images"
    }

    async fn call(&self, input: &ArtworkPromptInput) -> Result<Vec<u8>, ProviderError> {
        let body = json!({
            "model": OPENAI_IMAGE_MODEL,
            "prompt": input.prompt,
            "n": 1,
            "size": "1024x1024",
            "response_format": "b64_json",
        });

        let response = self
            .client
            .post(OPENAI_IMAGES_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), body));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let encoded = parsed["data"][0]["b64_json"]
            .as_str()
            .ok_or_else(|| ProviderError::Malformed("no image data".to_string()))?;

        decode_b64(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_b64_roundtrip() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"png-bytes");
        assert_eq!(decode_b64(&encoded).unwrap(), b"png-bytes");
    }

    #[test]
    fn test_decode_b64_rejects_garbage() {
        assert!(matches!(decode_b64("not base64!!!"), Err(ProviderError::Malformed(_))));
    }
}
