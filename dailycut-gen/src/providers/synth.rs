//! Audio synthesis tier
//!
//! Single long-running tier against a serverless inference endpoint -
//! fallback across synthesis providers is deliberately not supported.
//! The executor wraps the call in the minutes-scale synthesis timeout;
//! the HTTP client's own timeout sits above it so the executor's
//! classification (timeout vs rejection) stays authoritative.

use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use std::time::Duration;

use crate::executor::{ProviderError, ProviderTier};
use crate::models::{SynthesisRequest, SynthesizedAudio};

const SYNTH_BASE_URL: &str = "https://api.runpod.ai/v2";

pub struct ServerlessSynthClient {
    client: reqwest::Client,
    api_key: String,
    endpoint_id: String,
}

impl ServerlessSynthClient {
    pub fn new(
        api_key: String,
        endpoint_id: String,
        synthesis_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(synthesis_timeout + Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self { client, api_key, endpoint_id })
    }
}

#[async_trait]
impl ProviderTier<SynthesisRequest, SynthesizedAudio> for ServerlessSynthClient {
    fn name(&self) -> &str {
        "runpod"
    }

    async fn call(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, ProviderError> {
        let url = format!("{}/{}/runsync", SYNTH_BASE_URL, self.endpoint_id);
        let body = json!({
            "input": {
                "genre_tags": request.genre_tags,
                "lyrics": request.lyrics,
            }
        });

        tracing::info!(
            endpoint = %self.endpoint_id,
            lyrics_len = request.lyrics.len(),
            "Submitting synthesis job (may take several minutes)"
        );

        let response = self
            .client
            .post(&url)
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

        // The job result may sit under "output" or at the top level
        let output = if parsed.get("output").is_some() { &parsed["output"] } else { &parsed };

        if let Some(error) = output.get("error").and_then(|e| e.as_str()) {
            return Err(ProviderError::Api(500, format!("synthesis handler error: {}", error)));
        }

        let audio_b64 = output
            .get("audio")
            .and_then(|a| a.as_str())
            .ok_or_else(|| ProviderError::Malformed("response carries no audio".to_string()))?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(audio_b64)
            .map_err(|e| ProviderError::Malformed(format!("invalid base64 audio: {}", e)))?;

        let filename = output
            .get("filename")
            .and_then(|f| f.as_str())
            .unwrap_or("song.wav")
            .to_string();

        tracing::info!(
            filename = %filename,
            size_mb = data.len() as f64 / 1024.0 / 1024.0,
            "Synthesis job returned audio"
        );

        Ok(SynthesizedAudio { data, filename })
    }
}

/// Normalize lyrics for the synthesis model: sections separated by a
/// double newline, no triple newlines, trailing newline present.
pub fn format_lyrics_for_synthesis(lyrics: &str) -> String {
    let mut formatted = lyrics.trim().replace("\n[", "\n\n[");
    while formatted.contains("\n\n\n") {
        formatted = formatted.replace("\n\n\n", "\n\n");
    }
    if !formatted.ends_with('\n') {
        formatted.push('\n');
    }
    formatted
}

/// Coarse user-facing status for the long-running synthesis job
pub fn synthesis_status_message(elapsed: Duration) -> &'static str {
    match elapsed.as_secs() / 60 {
        0 => "Initializing synthesis model...",
        1..=2 => "Loading models and processing lyrics...",
        3..=4 => "Generating audio (stage 1)...",
        5..=6 => "Generating audio (stage 2)...",
        7..=9 => "Upsampling audio quality...",
        10..=11 => "Finalizing song...",
        _ => "Still processing (this may take up to 15 minutes)...",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_lyrics_separates_sections() {
        let raw = "[verse]\nline one\n[chorus]\nline two";
        let formatted = format_lyrics_for_synthesis(raw);
        assert_eq!(formatted, "[verse]\nline one\n\n[chorus]\nline two\n");
    }

    #[test]
    fn test_format_lyrics_collapses_triple_newlines() {
        let raw = "[verse]\na\n\n\n\n[chorus]\nb\n";
        let formatted = format_lyrics_for_synthesis(raw);
        assert!(!formatted.contains("\n\n\n"));
        assert!(formatted.ends_with('\n'));
    }

    #[test]
    fn test_status_messages_progress_with_time() {
        assert_eq!(
            synthesis_status_message(Duration::from_secs(30)),
            "Initializing synthesis model..."
        );
        assert_eq!(
            synthesis_status_message(Duration::from_secs(8 * 60)),
            "Upsampling audio quality..."
        );
        assert_eq!(
            synthesis_status_message(Duration::from_secs(20 * 60)),
            "Still processing (this may take up to 15 minutes)..."
        );
    }
}
