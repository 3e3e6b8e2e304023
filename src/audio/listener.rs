use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

use super::frames::{CaptureError, FrameSource};

/// Energy-gate tuning for capturing one spoken command.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Starting RMS threshold on the i16 scale.
    pub energy_threshold: f32,
    /// Calibration target = ambient RMS × this ratio.
    pub dynamic_energy_ratio: f32,
    /// Fraction of the old threshold kept per second of calibration.
    pub adjustment_damping: f32,
    pub ambient_duration: Duration,
    /// Give up if speech has not started within this window.
    pub onset_timeout: Duration,
    /// Hard cap on the phrase once it has started.
    pub phrase_time_limit: Duration,
    /// Trailing silence that ends a phrase.
    pub pause_threshold: Duration,
    /// Silence kept on either side of the phrase.
    pub non_speaking_duration: Duration,
    /// Samples per analysis chunk.
    pub chunk_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 300.0,
            dynamic_energy_ratio: 1.5,
            adjustment_damping: 0.15,
            ambient_duration: Duration::from_secs(1),
            onset_timeout: Duration::from_secs(15),
            phrase_time_limit: Duration::from_secs(5),
            pause_threshold: Duration::from_millis(800),
            non_speaking_duration: Duration::from_millis(500),
            chunk_size: 1024,
        }
    }
}

/// One captured phrase.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl Utterance {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ListenError {
    #[error("no speech within {0:?}")]
    NoSpeech(Duration),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Captures a single phrase from a [`FrameSource`] using an RMS energy gate.
///
/// Time is counted in samples read, never wall clock, so behaviour is the same
/// for a live microphone and a scripted source.
#[derive(Debug, Clone)]
pub struct UtteranceListener {
    config: ListenerConfig,
    threshold: f32,
}

impl UtteranceListener {
    pub fn new(config: ListenerConfig) -> Self {
        let threshold = config.energy_threshold;
        Self { config, threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Moves the threshold toward the ambient level over `ambient_duration`.
    pub async fn adjust_for_ambient_noise<F: FrameSource>(&mut self, source: &mut F) -> Result<(), CaptureError> {
        let seconds_per_chunk = self.seconds_per_chunk(source.sample_rate());
        let damping = self.config.adjustment_damping.powf(seconds_per_chunk);
        let duration = self.config.ambient_duration.as_secs_f32();

        let mut chunk = vec![0i16; self.config.chunk_size];
        let mut elapsed = 0.0f32;
        loop {
            elapsed += seconds_per_chunk;
            if elapsed > duration {
                break;
            }
            source.read_frame(&mut chunk).await?;
            let target = rms(&chunk) * self.config.dynamic_energy_ratio;
            self.threshold = self.threshold * damping + target * (1.0 - damping);
        }

        debug!("Ambient calibration done, threshold {:.1}", self.threshold);
        Ok(())
    }

    /// Waits for speech onset, then records until a pause or the phrase limit.
    pub async fn listen<F: FrameSource>(&mut self, source: &mut F) -> Result<Utterance, ListenError> {
        let sample_rate = source.sample_rate();
        let seconds_per_chunk = self.seconds_per_chunk(sample_rate);
        let pause_chunks = chunks_for(self.config.pause_threshold, seconds_per_chunk);
        let non_speaking_chunks = chunks_for(self.config.non_speaking_duration, seconds_per_chunk);
        let onset_timeout = self.config.onset_timeout.as_secs_f32();
        let phrase_limit = self.config.phrase_time_limit.as_secs_f32();

        let mut buffered: VecDeque<Vec<i16>> = VecDeque::new();
        let mut elapsed = 0.0f32;

        // Onset: keep a short pre-roll so the first syllable survives.
        loop {
            elapsed += seconds_per_chunk;
            if elapsed > onset_timeout {
                return Err(ListenError::NoSpeech(self.config.onset_timeout));
            }
            let mut chunk = vec![0i16; self.config.chunk_size];
            source.read_frame(&mut chunk).await?;
            let loud = rms(&chunk) > self.threshold;
            buffered.push_back(chunk);
            if loud {
                break;
            }
            if buffered.len() > non_speaking_chunks {
                buffered.pop_front();
            }
        }

        debug!("Speech onset after {:.2}s", elapsed);

        let mut phrase_elapsed = 0.0f32;
        let mut pause_count = 0usize;
        loop {
            phrase_elapsed += seconds_per_chunk;
            if phrase_elapsed > phrase_limit {
                break;
            }
            let mut chunk = vec![0i16; self.config.chunk_size];
            source.read_frame(&mut chunk).await?;
            if rms(&chunk) > self.threshold {
                pause_count = 0;
            } else {
                pause_count += 1;
            }
            buffered.push_back(chunk);
            if pause_count > pause_chunks {
                break;
            }
        }

        // Keep only `non_speaking_chunks` of the trailing silence.
        for _ in 0..pause_count.saturating_sub(non_speaking_chunks) {
            buffered.pop_back();
        }

        let samples: Vec<i16> = buffered.into_iter().flatten().collect();
        debug!("Captured {} samples", samples.len());
        Ok(Utterance { samples, sample_rate })
    }

    fn seconds_per_chunk(&self, sample_rate: u32) -> f32 {
        self.config.chunk_size as f32 / sample_rate as f32
    }
}

fn chunks_for(duration: Duration, seconds_per_chunk: f32) -> usize {
    (duration.as_secs_f32() / seconds_per_chunk).ceil() as usize
}

/// Root-mean-square amplitude on the i16 scale.
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sq_sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sq_sum / samples.len() as f64).sqrt() as f32
}
