//! Emitter station.
//!
//! Single owner of the [`Session`]: receives transcribed windows from every
//! track pipeline over one mailbox, runs extraction/sentence/cleanup, and
//! publishes the results. Because all mutation happens on this task's turn,
//! emissions are totally ordered even with several simultaneous tracks.

use crate::config::Config;
use crate::correction::{CorrectionRequest, Corrector};
use crate::defaults;
use crate::session::Session;
use crate::streaming::frame::{EmitterCommand, TranscribedWindow};
use crate::stt::language::normalize_language;
use crate::text::cleanup::wer_proxy;
use crate::transport::envelope::{
    Envelope, MetricsPayload, SegmentSource, StatusPayload, TranscriptBatch, TranscriptPayload,
    TranscriptSegment,
};
use crate::transport::{DataChannel, epoch_ms};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Emitter station owning the session and the outbound collaborators.
pub struct Emitter {
    session: Session,
    channel: Arc<dyn DataChannel>,
    corrector: Arc<dyn Corrector>,
    topic: String,
    room_name: String,
    confidence_threshold: f32,
    correction_enabled: bool,
    language: Option<String>,
    domain_hint: Option<String>,
    terminology: Vec<String>,
}

impl Emitter {
    pub fn new(
        config: &Config,
        channel: Arc<dyn DataChannel>,
        corrector: Arc<dyn Corrector>,
    ) -> Self {
        Self {
            session: Session::new(),
            channel,
            corrector,
            topic: config.room.topic.clone(),
            room_name: config.room.name.clone(),
            confidence_threshold: config.sentence.confidence_threshold,
            correction_enabled: config.correction.enabled,
            language: config
                .stt
                .language
                .as_deref()
                .and_then(normalize_language)
                .map(str::to_string),
            domain_hint: config.hints.domain_hint.clone(),
            terminology: config.hints.terminology.clone(),
        }
    }

    /// Drains the mailbox until every sender is gone, then resets.
    pub async fn run(mut self, mut commands: mpsc::Receiver<EmitterCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                EmitterCommand::Window(window) => self.handle_window(window).await,
                EmitterCommand::Status(status) => self.publish_status(status).await,
                EmitterCommand::Skipped { chunk_id } => {
                    self.session.mark_skipped();
                    debug!(chunk_id, "window counted as skipped");
                }
                EmitterCommand::Reset => self.reset(),
            }
        }
        self.reset();
    }

    async fn handle_window(&mut self, window: TranscribedWindow) {
        let Some(released) =
            self.session
                .absorb(&window.text, &window.segments, self.confidence_threshold)
        else {
            return;
        };

        let confidence = window
            .segments
            .iter()
            .filter_map(|s| s.confidence)
            .fold(None::<f32>, |best, c| Some(best.map_or(c, |b| b.max(c))));

        let segment = TranscriptSegment {
            id: format!("{}-0", window.chunk_id),
            text: released.text.clone(),
            start_ms: window.start_ms,
            end_ms: window.end_ms,
            is_final: true,
            revision: 0,
            source: SegmentSource::Stt,
            confidence,
            created_at: epoch_ms(),
        };
        self.session.record_emission(segment.clone());

        let batch = TranscriptBatch {
            id: Uuid::new_v4().to_string(),
            segments: vec![segment],
            received_at: epoch_ms(),
        };

        let transcript = Envelope::Transcript(TranscriptPayload {
            source: SegmentSource::Stt,
            batch: batch.clone(),
        });
        // Best-effort: a failed broadcast is logged, never retried
        if let Err(e) = self.channel.publish(&self.topic, &transcript, true).await {
            warn!(error = %e, chunk_id = window.chunk_id, "transcript broadcast failed");
        }

        let now = epoch_ms();
        let metrics = Envelope::Metrics(MetricsPayload {
            chunk_id: window.chunk_id,
            latency_ms: now.saturating_sub(window.completed_at_ms),
            confidence: confidence.unwrap_or(1.0),
            wer_proxy: wer_proxy(&window.text, &released.text),
            timestamp: now,
        });
        if let Err(e) = self.channel.publish(&self.topic, &metrics, false).await {
            debug!(error = %e, "metrics publish failed");
        }

        if self.correction_enabled {
            self.forward_correction(batch).await;
        }
    }

    async fn forward_correction(&mut self, batch: TranscriptBatch) {
        let request = CorrectionRequest {
            request_id: Uuid::new_v4().to_string(),
            room_name: self.room_name.clone(),
            target_identities: None,
            batch,
            context: self
                .session
                .recent_context(defaults::CORRECTION_CONTEXT_SEGMENTS),
            language: self.language.clone(),
            domain_hint: self.domain_hint.clone(),
            terminology: if self.terminology.is_empty() {
                None
            } else {
                Some(self.terminology.clone())
            },
        };

        if let Err(e) = self.corrector.forward(&request).await {
            error!(error = %e, corrector = self.corrector.name(), "correction forward failed");
            self.publish_status(StatusPayload::error(format!("correction failed: {}", e)))
                .await;
        }
    }

    async fn publish_status(&self, status: StatusPayload) {
        let envelope = Envelope::Status(status);
        if let Err(e) = self.channel.publish(&self.topic, &envelope, false).await {
            debug!(error = %e, "status publish failed");
        }
    }

    fn reset(&mut self) {
        let (processed, skipped) = self.session.counters();
        info!(processed, skipped, "session reset");
        self.session.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::MockCorrector;
    use crate::stt::transcriber::SttSegment;
    use crate::transport::MockDataChannel;

    fn window(chunk_id: u64, text: &str, confidence: f32) -> TranscribedWindow {
        TranscribedWindow {
            chunk_id,
            start_ms: chunk_id * 1000,
            end_ms: chunk_id * 1000 + 3000,
            completed_at_ms: epoch_ms(),
            text: text.to_string(),
            segments: vec![SttSegment {
                text: Some(text.to_string()),
                confidence: Some(confidence),
                start: None,
                end: None,
            }],
        }
    }

    fn harness() -> (Arc<MockDataChannel>, Arc<MockCorrector>, Emitter) {
        let mut config = Config::default();
        config.correction.enabled = true;
        config.room.name = "room-1".to_string();
        let channel = Arc::new(MockDataChannel::new());
        let corrector = Arc::new(MockCorrector::new());
        let emitter = Emitter::new(&config, channel.clone(), corrector.clone());
        (channel, corrector, emitter)
    }

    #[tokio::test]
    async fn complete_sentence_produces_transcript_metrics_and_correction() {
        let (channel, corrector, emitter) = harness();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(emitter.run(rx));

        tx.send(EmitterCommand::Window(window(0, "It rained today.", 0.9)))
            .await
            .unwrap();
        drop(tx);
        task.await.unwrap();

        let envelopes = channel.envelopes();
        assert_eq!(envelopes.len(), 2);

        match &envelopes[0] {
            Envelope::Transcript(payload) => {
                assert_eq!(payload.source, SegmentSource::Stt);
                let segment = &payload.batch.segments[0];
                assert_eq!(segment.id, "0-0");
                assert_eq!(segment.text, "It rained today.");
                assert_eq!(segment.end_ms - segment.start_ms, 3000);
                assert!(segment.is_final);
                assert_eq!(segment.revision, 0);
                assert_eq!(segment.confidence, Some(0.9));
            }
            other => panic!("expected transcript, got {:?}", other),
        }
        match &envelopes[1] {
            Envelope::Metrics(metrics) => {
                assert_eq!(metrics.chunk_id, 0);
                assert_eq!(metrics.wer_proxy, 0.0);
            }
            other => panic!("expected metrics, got {:?}", other),
        }

        let requests = corrector.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].room_name, "room-1");
        // The just-emitted segment is part of the context
        assert_eq!(requests[0].context.last().unwrap().text, "It rained today.");
    }

    #[tokio::test]
    async fn transcript_is_reliable_others_lossy() {
        let (channel, _corrector, emitter) = harness();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(emitter.run(rx));

        tx.send(EmitterCommand::Status(StatusPayload::info("note")))
            .await
            .unwrap();
        tx.send(EmitterCommand::Window(window(1, "Sure thing.", 0.8)))
            .await
            .unwrap();
        drop(tx);
        task.await.unwrap();

        let published = channel.published();
        for (_, envelope, reliable) in &published {
            match envelope {
                Envelope::Transcript(_) => assert!(reliable),
                Envelope::Status(_) | Envelope::Metrics(_) => assert!(!reliable),
            }
        }
    }

    #[tokio::test]
    async fn incomplete_sentence_emits_nothing() {
        let (channel, corrector, emitter) = harness();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(emitter.run(rx));

        tx.send(EmitterCommand::Window(window(0, "no terminator here", 0.9)))
            .await
            .unwrap();
        drop(tx);
        task.await.unwrap();

        assert!(channel.envelopes().is_empty());
        assert!(corrector.requests().is_empty());
    }

    #[tokio::test]
    async fn overlapping_windows_are_deduplicated() {
        let (channel, _corrector, emitter) = harness();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(emitter.run(rx));

        tx.send(EmitterCommand::Window(window(0, "The quick brown fox.", 0.9)))
            .await
            .unwrap();
        // Second window re-transcribes the first entirely
        tx.send(EmitterCommand::Window(window(1, "The quick brown fox.", 0.9)))
            .await
            .unwrap();
        drop(tx);
        task.await.unwrap();

        let transcripts: Vec<_> = channel
            .envelopes()
            .into_iter()
            .filter(|e| matches!(e, Envelope::Transcript(_)))
            .collect();
        assert_eq!(transcripts.len(), 1);
    }

    #[tokio::test]
    async fn correction_failure_emits_status_not_retry() {
        let mut config = Config::default();
        config.correction.enabled = true;
        let channel = Arc::new(MockDataChannel::new());
        let corrector = Arc::new(MockCorrector::new().with_failure());
        let emitter = Emitter::new(&config, channel.clone(), corrector);

        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(emitter.run(rx));
        tx.send(EmitterCommand::Window(window(0, "Done now.", 0.9)))
            .await
            .unwrap();
        drop(tx);
        task.await.unwrap();

        let has_error_status = channel.envelopes().iter().any(|e| {
            matches!(e, Envelope::Status(s) if s.level == crate::transport::envelope::StatusLevel::Error)
        });
        assert!(has_error_status);
        // The transcript itself still went out
        assert!(channel
            .envelopes()
            .iter()
            .any(|e| matches!(e, Envelope::Transcript(_))));
    }

    #[tokio::test]
    async fn broadcast_failure_is_swallowed() {
        let config = Config::default();
        let channel = Arc::new(MockDataChannel::new().with_failure());
        let corrector = Arc::new(MockCorrector::new());
        let emitter = Emitter::new(&config, channel, corrector);

        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(emitter.run(rx));
        tx.send(EmitterCommand::Window(window(0, "Fine then.", 0.9)))
            .await
            .unwrap();
        drop(tx);
        // The emitter must not panic or error out
        task.await.unwrap();
    }

    #[tokio::test]
    async fn reset_clears_history_between_sessions() {
        let (channel, _corrector, emitter) = harness();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(emitter.run(rx));

        tx.send(EmitterCommand::Window(window(0, "The quick brown fox.", 0.9)))
            .await
            .unwrap();
        tx.send(EmitterCommand::Reset).await.unwrap();
        // Same text again: with history gone it emits again
        tx.send(EmitterCommand::Window(window(1, "The quick brown fox.", 0.9)))
            .await
            .unwrap();
        drop(tx);
        task.await.unwrap();

        let transcripts: Vec<_> = channel
            .envelopes()
            .into_iter()
            .filter(|e| matches!(e, Envelope::Transcript(_)))
            .collect();
        assert_eq!(transcripts.len(), 2);
    }
}
