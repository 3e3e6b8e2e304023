#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WakeError {
    #[error("wake-word engine failed to initialize: {0}")]
    Init(String),

    #[error("wake-word engine rejected frame: {0}")]
    Process(String),
}

/// Keyword spotter fed one fixed-length frame at a time.
pub trait WakeWordEngine {
    fn sample_rate(&self) -> u32;

    fn frame_length(&self) -> usize;

    /// Index of the detected keyword, or a negative value when nothing was heard.
    fn process(&mut self, frame: &[i16]) -> Result<i32, WakeError>;
}

#[cfg(feature = "wake-word")]
mod rustpotter_engine {
    use rustpotter::{Rustpotter, RustpotterConfig, SampleFormat};
    use tracing::info;

    use super::{WakeError, WakeWordEngine};

    /// Wake word detection via rustpotter models (`.rpw`).
    pub struct RustpotterEngine {
        detector: Rustpotter,
        keywords: Vec<String>,
        sample_rate: u32,
        scratch: Vec<f32>,
    }

    impl RustpotterEngine {
        pub fn new(model_paths: &[String], sample_rate: u32) -> Result<Self, WakeError> {
            let mut config = RustpotterConfig::default();
            config.fmt.sample_rate = sample_rate as usize;
            config.fmt.channels = 1;
            config.fmt.sample_format = SampleFormat::F32;

            let mut detector = Rustpotter::new(&config).map_err(|e| WakeError::Init(e.to_string()))?;
            let mut keywords = Vec::with_capacity(model_paths.len());
            for (i, path) in model_paths.iter().enumerate() {
                let key = format!("keyword-{}", i);
                detector
                    .add_wakeword_from_file(&key, path)
                    .map_err(|e| WakeError::Init(format!("{}: {}", path, e)))?;
                info!("Wake word model loaded from {}", path);
                keywords.push(key);
            }
            if keywords.is_empty() {
                return Err(WakeError::Init("no keyword models configured".into()));
            }

            Ok(Self {
                detector,
                keywords,
                sample_rate,
                scratch: Vec::new(),
            })
        }
    }

    impl WakeWordEngine for RustpotterEngine {
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn frame_length(&self) -> usize {
            self.detector.get_samples_per_frame()
        }

        fn process(&mut self, frame: &[i16]) -> Result<i32, WakeError> {
            if frame.len() != self.frame_length() {
                return Err(WakeError::Process(format!(
                    "expected {} samples, got {}",
                    self.frame_length(),
                    frame.len()
                )));
            }
            self.scratch.clear();
            self.scratch.extend(frame.iter().map(|&s| s as f32 / i16::MAX as f32));

            Ok(match self.detector.process_f32(&self.scratch) {
                Some(detection) => self
                    .keywords
                    .iter()
                    .position(|k| *k == detection.name)
                    .map(|i| i as i32)
                    .unwrap_or(0),
                None => -1,
            })
        }
    }

    impl Drop for RustpotterEngine {
        fn drop(&mut self) {
            info!("Wake word engine released");
        }
    }
}

#[cfg(feature = "wake-word")]
pub use rustpotter_engine::RustpotterEngine;
