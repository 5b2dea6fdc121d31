//! Per-track pipeline and the wiring that connects tracks to the emitter.
//!
//! Each subscribed audio track drives one `TrackPipeline` task:
//! normalize → AGC → sliding window, then per completed window VAD gate →
//! WAV encode → STT. Transcribed windows go to the emitter mailbox; the
//! pipeline never touches session state itself.
//!
//! Processing within a pipeline is strictly sequential: a new frame is not
//! consumed while a chunk is in flight, and between chunks of one frame
//! batch the task yields once so other tracks can run.

use crate::audio::agc::Agc;
use crate::audio::sample_buffer::FrameNormalizer;
use crate::audio::vad::WindowVad;
use crate::audio::wav::encode_wav;
use crate::config::{Config, ParticipantHints};
use crate::error::Result;
use crate::streaming::emitter::Emitter;
use crate::streaming::frame::{AudioChunk, EmitterCommand, TranscribedWindow};
use crate::streaming::window::SlidingWindow;
use crate::stt::transcriber::{SpeechToText, TranscribeOptions};
use crate::transport::envelope::StatusPayload;
use crate::transport::{DataChannel, ParticipantMeta, RoomAudioFrame, epoch_ms};
use crate::correction::Corrector;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Per-track pipeline state (the track context).
pub struct TrackPipeline {
    normalizer: FrameNormalizer,
    agc: Agc,
    vad: WindowVad,
    window: SlidingWindow,
    stt: Arc<dyn SpeechToText>,
    emitter: mpsc::Sender<EmitterCommand>,
    options: TranscribeOptions,
    frames_rejected: u64,
}

impl TrackPipeline {
    pub fn new(
        config: &Config,
        meta: Option<&ParticipantMeta>,
        stt: Arc<dyn SpeechToText>,
        emitter: mpsc::Sender<EmitterCommand>,
    ) -> Result<Self> {
        let hints = ParticipantHints::resolve(config, meta);
        let options = TranscribeOptions {
            language: hints.language.clone(),
            prompt: build_prompt(&hints),
            temperature: config.stt.temperature,
        };

        Ok(Self {
            normalizer: FrameNormalizer::new(config.audio.sample_rate),
            agc: Agc::new(config.agc.clone()),
            vad: WindowVad::new(config.vad.clone(), config.audio.window_ms),
            window: SlidingWindow::new(
                config.audio.sample_rate,
                config.audio.window_ms,
                config.audio.stride_ms,
            )?,
            stt,
            emitter,
            options,
            frames_rejected: 0,
        })
    }

    /// Processes one frame, swallowing frame-level failures.
    ///
    /// A frame with an unsupported layout is logged and dropped; the track
    /// keeps running. Nothing propagates to the audio ingress path.
    pub async fn handle_frame(&mut self, frame: RoomAudioFrame) {
        if let Err(e) = self.process_frame(frame).await {
            self.frames_rejected += 1;
            warn!(error = %e, "dropping frame");
        }
    }

    async fn process_frame(&mut self, frame: RoomAudioFrame) -> Result<()> {
        let mut mono = self.normalizer.normalize(&frame)?;
        self.agc.process(&mut mono);

        let chunks = self.window.append(&mono, epoch_ms())?;
        for chunk in chunks {
            self.process_chunk(chunk).await;
            // Cooperative hand-off between chunks of the same batch
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    /// Chunk-processing boundary: every transient failure ends here.
    async fn process_chunk(&mut self, chunk: AudioChunk) {
        let decision = self.vad.assess(&chunk.samples);
        if !decision.is_speech {
            debug!(
                chunk_id = chunk.chunk_id,
                score = decision.score,
                rms = decision.rms,
                "window rejected as non-speech"
            );
            let _ = self
                .emitter
                .send(EmitterCommand::Skipped {
                    chunk_id: chunk.chunk_id,
                })
                .await;
            let _ = self
                .emitter
                .send(EmitterCommand::Status(StatusPayload::info(format!(
                    "window {} skipped: score {:.2} below sensitivity",
                    chunk.chunk_id, decision.score
                ))))
                .await;
            return;
        }

        match self.transcribe(&chunk).await {
            Ok(response) => {
                let _ = self
                    .emitter
                    .send(EmitterCommand::Window(TranscribedWindow {
                        chunk_id: chunk.chunk_id,
                        start_ms: chunk.start_ms,
                        end_ms: chunk.end_ms,
                        completed_at_ms: chunk.completed_at_ms,
                        text: response.text,
                        segments: response.segments,
                    }))
                    .await;
            }
            Err(e) => {
                // Window dropped, not retried; timestamps already advanced
                error!(error = %e, chunk_id = chunk.chunk_id, "transcription failed");
                let _ = self
                    .emitter
                    .send(EmitterCommand::Status(StatusPayload::error(format!(
                        "window {} dropped: {}",
                        chunk.chunk_id, e
                    ))))
                    .await;
            }
        }
    }

    async fn transcribe(&self, chunk: &AudioChunk) -> Result<crate::stt::transcriber::SttResponse> {
        let wav = encode_wav(&chunk.samples, chunk.sample_rate, chunk.channels)?;
        self.stt.transcribe(wav, &self.options).await
    }
}

/// Folds participant hints into an STT prompt string.
fn build_prompt(hints: &ParticipantHints) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(prompt) = &hints.prompt {
        parts.push(prompt.clone());
    }
    if let Some(domain) = &hints.domain_hint {
        parts.push(format!("Domain: {}", domain));
    }
    if !hints.terminology.is_empty() {
        parts.push(format!("Terms: {}", hints.terminology.join(", ")));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Consumes frames until the sender drops (track unsubscribed).
pub async fn run_track(mut pipeline: TrackPipeline, mut frames: mpsc::Receiver<RoomAudioFrame>) {
    while let Some(frame) = frames.recv().await {
        pipeline.handle_frame(frame).await;
    }
    debug!(
        frames_rejected = pipeline.frames_rejected,
        "track pipeline finished"
    );
}

/// Wires tracks and the emitter together.
pub struct Pipeline {
    config: Arc<Config>,
    stt: Arc<dyn SpeechToText>,
    channel: Arc<dyn DataChannel>,
    corrector: Arc<dyn Corrector>,
}

impl Pipeline {
    /// Validates the configuration and captures the collaborators.
    pub fn new(
        config: Arc<Config>,
        stt: Arc<dyn SpeechToText>,
        channel: Arc<dyn DataChannel>,
        corrector: Arc<dyn Corrector>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stt,
            channel,
            corrector,
        })
    }

    /// Spawns the emitter task and returns a handle for subscribing tracks.
    pub fn start(&self) -> PipelineHandle {
        let (emitter_tx, emitter_rx) = mpsc::channel(256);
        let emitter = Emitter::new(&self.config, self.channel.clone(), self.corrector.clone());
        let emitter_task = tokio::spawn(emitter.run(emitter_rx));

        PipelineHandle {
            config: self.config.clone(),
            stt: self.stt.clone(),
            emitter_tx,
            emitter_task,
            active_tracks: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    config: Arc<Config>,
    stt: Arc<dyn SpeechToText>,
    emitter_tx: mpsc::Sender<EmitterCommand>,
    emitter_task: JoinHandle<()>,
    active_tracks: Arc<AtomicUsize>,
}

impl PipelineHandle {
    /// Subscribes one audio track; frames go into the returned sender.
    ///
    /// Dropping the sender unsubscribes the track. When the last track
    /// disconnects, the session state is reset.
    pub fn subscribe_track(
        &self,
        meta: Option<&ParticipantMeta>,
    ) -> Result<mpsc::Sender<RoomAudioFrame>> {
        let pipeline = TrackPipeline::new(
            &self.config,
            meta,
            self.stt.clone(),
            self.emitter_tx.clone(),
        )?;

        let (frame_tx, frame_rx) = mpsc::channel(64);
        self.active_tracks.fetch_add(1, Ordering::SeqCst);
        let active = self.active_tracks.clone();
        let emitter_tx = self.emitter_tx.clone();

        tokio::spawn(async move {
            run_track(pipeline, frame_rx).await;
            if active.fetch_sub(1, Ordering::SeqCst) == 1 {
                let _ = emitter_tx.send(EmitterCommand::Reset).await;
            }
        });

        Ok(frame_tx)
    }

    /// Number of currently subscribed tracks.
    pub fn active_tracks(&self) -> usize {
        self.active_tracks.load(Ordering::SeqCst)
    }

    /// Waits for the emitter to drain after all tracks are gone.
    pub async fn join(self) {
        drop(self.emitter_tx);
        let _ = self.emitter_task.await;
    }
}
