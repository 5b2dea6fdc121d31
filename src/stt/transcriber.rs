//! The speech-to-text seam.
//!
//! The trait keeps the pipeline testable: production uses the HTTP adapter,
//! tests script a `MockTranscriber`.

use crate::error::{Result, RoomscribeError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Normalized STT response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SttResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<SttSegment>,
}

/// One segment of the verbose response; every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SttSegment {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
}

/// Per-request knobs resolved from config and participant hints.
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    pub language: Option<String>,
    pub prompt: Option<String>,
    pub temperature: f32,
}

/// Trait for window transcription.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe one WAV-encoded window.
    async fn transcribe(&self, wav: Vec<u8>, options: &TranscribeOptions) -> Result<SttResponse>;

    /// Name of the resolved model.
    fn model(&self) -> &str;
}

/// Mock transcriber for testing.
///
/// Responses are served from a script queue; once the queue drains, the
/// fallback response repeats.
pub struct MockTranscriber {
    model: String,
    script: Mutex<VecDeque<SttResponse>>,
    fallback: SttResponse,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockTranscriber {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            script: Mutex::new(VecDeque::new()),
            fallback: SttResponse::default(),
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sets the fallback response text.
    pub fn with_response(mut self, text: &str) -> Self {
        self.fallback = plain_response(text);
        self
    }

    /// Queues responses served in order before the fallback kicks in.
    pub fn with_script<I: IntoIterator<Item = &'static str>>(self, texts: I) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            for text in texts {
                script.push_back(plain_response(text));
            }
        }
        self
    }

    /// Queues one response with explicit segment confidences.
    pub fn push_scripted(&self, response: SttResponse) {
        self.script.lock().unwrap().push_back(response);
    }

    /// Configure the mock to fail every call.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// How many transcription calls were made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn plain_response(text: &str) -> SttResponse {
    SttResponse {
        text: text.to_string(),
        segments: vec![SttSegment {
            text: Some(text.to_string()),
            confidence: Some(0.9),
            start: None,
            end: None,
        }],
    }
}

#[async_trait]
impl SpeechToText for MockTranscriber {
    async fn transcribe(&self, _wav: Vec<u8>, _options: &TranscribeOptions) -> Result<SttResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(RoomscribeError::Transcription {
                message: "mock transcription failure".to_string(),
            });
        }
        let scripted = self.script.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| self.fallback.clone()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_serves_fallback() {
        let stt = MockTranscriber::new("test-model").with_response("hello world");
        let response = stt.transcribe(vec![], &TranscribeOptions::default()).await.unwrap();
        assert_eq!(response.text, "hello world");
        assert_eq!(stt.calls(), 1);
    }

    #[tokio::test]
    async fn mock_serves_script_in_order_then_fallback() {
        let stt = MockTranscriber::new("test-model")
            .with_response("fallback")
            .with_script(["first", "second"]);

        let options = TranscribeOptions::default();
        assert_eq!(stt.transcribe(vec![], &options).await.unwrap().text, "first");
        assert_eq!(stt.transcribe(vec![], &options).await.unwrap().text, "second");
        assert_eq!(stt.transcribe(vec![], &options).await.unwrap().text, "fallback");
        assert_eq!(stt.calls(), 3);
    }

    #[tokio::test]
    async fn mock_failure_mode() {
        let stt = MockTranscriber::new("test-model").with_failure();
        let result = stt.transcribe(vec![], &TranscribeOptions::default()).await;
        assert!(matches!(
            result,
            Err(RoomscribeError::Transcription { .. })
        ));
    }

    #[test]
    fn response_deserializes_with_missing_fields() {
        let response: SttResponse = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(response.text, "hi");
        assert!(response.segments.is_empty());

        let response: SttResponse = serde_json::from_str(
            r#"{"text": "hi", "segments": [{"confidence": 0.5}, {"text": "hi"}]}"#,
        )
        .unwrap();
        assert_eq!(response.segments.len(), 2);
        assert_eq!(response.segments[0].confidence, Some(0.5));
        assert!(response.segments[1].confidence.is_none());
    }

    #[test]
    fn trait_is_object_safe() {
        let stt: Box<dyn SpeechToText> = Box::new(MockTranscriber::new("boxed"));
        assert_eq!(stt.model(), "boxed");
    }
}
