use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::session::{Dispatcher, SessionConfig, VoiceSession};
use crate::audio::{CaptureError, FrameSource, UtteranceListener, WakeError, WakeWordEngine};
use crate::device::{Command, DeviceLink, SerialTransport};
use crate::services::stt::SpeechToText;

#[derive(Debug, thiserror::Error)]
pub enum WakeLoopError {
    #[error("audio source runs at {source_rate}Hz but the wake-word engine needs {engine_rate}Hz")]
    SampleRateMismatch { source_rate: u32, engine_rate: u32 },

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Engine(#[from] WakeError),
}

/// Listens for the wake word and runs one voice session per detection.
///
/// Owns the audio source and the engine; both are released when `run` returns,
/// whichever way it returns.
pub struct WakeLoop<F, E, S, T>
where
    F: FrameSource,
    E: WakeWordEngine,
    S: SpeechToText,
    T: SerialTransport,
{
    source: F,
    engine: E,
    recognizer: S,
    listener: UtteranceListener,
    link: Arc<DeviceLink<T>>,
    config: SessionConfig,
}

impl<F, E, S, T> WakeLoop<F, E, S, T>
where
    F: FrameSource,
    E: WakeWordEngine,
    S: SpeechToText,
    T: SerialTransport,
{
    pub fn new(
        source: F,
        engine: E,
        recognizer: S,
        listener: UtteranceListener,
        link: Arc<DeviceLink<T>>,
        config: SessionConfig,
    ) -> Result<Self, WakeLoopError> {
        if source.sample_rate() != engine.sample_rate() {
            return Err(WakeLoopError::SampleRateMismatch {
                source_rate: source.sample_rate(),
                engine_rate: engine.sample_rate(),
            });
        }
        Ok(Self {
            source,
            engine,
            recognizer,
            listener,
            link,
            config,
        })
    }

    /// Runs until `shutdown` fires (`Ok`) or capture/detection faults (`Err`).
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), WakeLoopError> {
        info!("Wake loop started. Frame: {} samples @ {}Hz", self.engine.frame_length(), self.engine.sample_rate());

        let result = self.detect(&shutdown).await;
        if let Err(e) = &result {
            error!("Error: {}", e);
        }

        let WakeLoop { source, engine, .. } = self;
        drop(source);
        drop(engine);
        info!("Resources used cleaned up");

        result
    }

    async fn detect(&mut self, shutdown: &CancellationToken) -> Result<(), WakeLoopError> {
        let mut frame = vec![0i16; self.engine.frame_length()];
        let awaken = Dispatcher::new(self.link.clone(), self.config.budget);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                read = self.source.read_frame(&mut frame) => read?,
            }

            let keyword = self.engine.process(&frame)?;
            if keyword < 0 {
                continue;
            }

            info!("Wake word detected (keyword {})", keyword);
            awaken.notify(Command::Awakened).await;

            let session = VoiceSession::new(
                &mut self.source,
                &mut self.listener,
                &self.recognizer,
                self.link.clone(),
                &self.config,
                shutdown.clone(),
            );
            let end = session.run().await?;
            info!("Session ended: {:?}", end);

            // Frames that piled up during the session are stale.
            self.source.discard_buffered();
        }
    }
}
