//! Bcut recognition backend — multipart upload, JSON envelope protocol.
//!
//! The service accepts the raw audio bytes as a multipart file upload and
//! answers with a `{code, message, data}` envelope.  A `code` other than `0`
//! inside a 2xx response is an application-level rejection.

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::api::{AsrBackend, BackendError, BackendKind};
use crate::backend::transcript::Segment;
use crate::config::BackendConfig;

// ---------------------------------------------------------------------------
// BcutBackend
// ---------------------------------------------------------------------------

/// Client for the Bcut recognition service.
///
/// All connection details (`base_url`, timeout) come from [`BackendConfig`];
/// nothing is hardcoded, so tests can point the client at a local stub.
pub struct BcutBackend {
    client: reqwest::Client,
    base_url: String,
}

impl BcutBackend {
    /// Build a `BcutBackend` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.  A default (no-timeout) client is used as a
    /// last-resort fallback if the builder fails (should never happen in
    /// practice).
    pub fn from_config(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.bcut_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AsrBackend for BcutBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Bcut
    }

    /// Upload `audio` and return the raw provider envelope.
    ///
    /// The envelope is returned verbatim (not just `data`) so the cache can
    /// persist exactly what the provider sent.
    async fn recognize(&self, audio: &[u8]) -> Result<Value, BackendError> {
        let url = format!("{}/v1/recognize", self.base_url);

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("audio")
            .mime_str("application/octet-stream")
            .map_err(|e| BackendError::Request(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model", "general")
            .part("file", part);

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        // Application-level error inside a 2xx response.
        let code = envelope["code"].as_i64().unwrap_or(-1);
        if code != 0 {
            let message = envelope["message"].as_str().unwrap_or("unknown error");
            return Err(BackendError::Rejected(format!("code {code}: {message}")));
        }

        Ok(envelope)
    }

    fn parse_segments(&self, payload: &Value) -> Result<Vec<Segment>, BackendError> {
        let subtitles = payload["data"]["subtitles"]
            .as_array()
            .ok_or_else(|| BackendError::Parse("missing data.subtitles array".into()))?;

        let mut segments = Vec::with_capacity(subtitles.len());
        for entry in subtitles {
            let text = entry["transcript"]
                .as_str()
                .ok_or_else(|| BackendError::Parse("subtitle entry missing transcript".into()))?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_backend() -> BcutBackend {
        BcutBackend::from_config(&BackendConfig::default())
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _backend = make_backend();
    }

    #[test]
    fn kind_is_bcut() {
        assert_eq!(make_backend().kind(), BackendKind::Bcut);
    }

    #[test]
    fn trailing_slash_in_base_url_is_trimmed() {
        let config = BackendConfig {
            bcut_base_url: "http://localhost:9000/".into(),
            ..BackendConfig::default()
        };
        let backend = BcutBackend::from_config(&config);
        assert_eq!(backend.base_url, "http://localhost:9000");
    }

    // ---- parse_segments ----------------------------------------------------

    #[test]
    fn parses_well_formed_envelope() {
        let payload = json!({
            "code": 0,
            "message": "ok",
            "data": {
                "subtitles": [
                    { "start_time": 0,     "end_time": 1_200, "transcript": "第一句" },
                    { "start_time": 1_200, "end_time": 2_400, "transcript": "第二句" }
                ]
            }
        });

        let segments = make_backend().parse_segments(&payload).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "第一句");
        assert_eq!(segments[1].start_ms, 1_200);
        assert_eq!(segments[1].end_ms, 2_400);
    }

    #[test]
    fn missing_subtitles_is_a_parse_error() {
        let payload = json!({ "code": 0, "data": {} });
        let err = make_backend().parse_segments(&payload).unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
    }

    #[test]
    fn entry_without_transcript_is_a_parse_error() {
        let payload = json!({
            "code": 0,
            "data": { "subtitles": [ { "start_time": 0, "end_time": 100 } ] }
        });
        let err = make_backend().parse_segments(&payload).unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
    }

    #[test]
    fn empty_subtitle_list_yields_empty_transcript() {
        let payload = json!({ "code": 0, "data": { "subtitles": [] } });
        let segments = make_backend().parse_segments(&payload).unwrap();
        assert!(segments.is_empty());
    }
}
