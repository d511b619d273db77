//! JianYing recognition backend — raw-body POST, utterance-list protocol.
//!
//! Unlike [`BcutBackend`](crate::backend::BcutBackend), this service takes
//! the audio as a raw `application/octet-stream` body with the submission
//! parameters in the query string, and answers with a flat
//! `{statuscode, utterances}` object instead of a nested envelope.

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::api::{AsrBackend, BackendError, BackendKind};
use crate::backend::transcript::Segment;
use crate::config::BackendConfig;

// ---------------------------------------------------------------------------
// JianYingBackend
// ---------------------------------------------------------------------------

/// Client for the JianYing recognition service.
pub struct JianYingBackend {
    client: reqwest::Client,
    base_url: String,
}

impl JianYingBackend {
    /// Build a `JianYingBackend` from application config.
    pub fn from_config(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.jianying_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AsrBackend for JianYingBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::JianYing
    }

    async fn recognize(&self, audio: &[u8]) -> Result<Value, BackendError> {
        let url = format!("{}/lv/v1/audio_subtitle/submit", self.base_url);

        let response = self
            .client
            .post(&url)
            .query(&[("format", "pcm"), ("words_per_line", "16")])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        let statuscode = payload["statuscode"].as_i64().unwrap_or(-1);
        if statuscode != 0 {
            let message = payload["message"].as_str().unwrap_or("unknown error");
            return Err(BackendError::Rejected(format!(
                "statuscode {statuscode}: {message}"
            )));
        }

        Ok(payload)
    }

    fn parse_segments(&self, payload: &Value) -> Result<Vec<Segment>, BackendError> {
        let utterances = payload["utterances"]
            .as_array()
            .ok_or_else(|| BackendError::Parse("missing utterances array".into()))?;

        let mut segments = Vec::with_capacity(utterances.len());
        for entry in utterances {
            let text = entry["text"]
                .as_str()
                .ok_or_else(|| BackendError::Parse("utterance missing text".into()))?;
            segments.push(Segment::new(
                entry["start_time"].as_u64().unwrap_or(0),
                entry["end_time"].as_u64().unwrap_or(0),
                text,
            ));
        }
        Ok(segments)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
