use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("no input device available")]
    NoDevice,

    #[error("unsupported input configuration: {0}")]
    Unsupported(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("audio stream closed")]
    Closed,
}

/// Mono 16-bit PCM input, consumed in caller-sized frames.
///
/// Both the wake loop and the utterance listener read through the same source;
/// the wake loop lends it to the session for the session's duration.
pub trait FrameSource {
    fn sample_rate(&self) -> u32;

    /// Fills `frame` completely, waiting until enough samples are available.
    fn read_frame(&mut self, frame: &mut [i16]) -> impl Future<Output = Result<(), CaptureError>>;

    /// Drops audio buffered while nobody was reading (e.g. during a device exchange).
    fn discard_buffered(&mut self) {}
}
