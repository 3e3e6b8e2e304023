use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info};

use super::frames::{CaptureError, FrameSource};

/// Two seconds of headroom at 16 kHz.
const RING_CAPACITY: usize = 32_768;
const POLL_SLEEP: Duration = Duration::from_millis(10);

/// Default microphone feeding a lock-free ring buffer.
///
/// Owns the cpal stream: dropping the capture stops the device.
pub struct AudioCapture {
    _stream: cpal::Stream,
    consumer: HeapCons<i16>,
    sample_rate: u32,
    stream_error: Arc<Mutex<Option<String>>>,
}

impl AudioCapture {
    /// Opens the default input at exactly `sample_rate` (the wake-word engine's rate), mono.
    pub fn open(sample_rate: u32) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        info!("Audio Input Device: {}", device.name().unwrap_or_default());

        let configs = device
            .supported_input_configs()
            .map_err(|e| CaptureError::Unsupported(e.to_string()))?;

        let mut selected = None;
        for range in configs {
            if range.channels() == 1
                && range.min_sample_rate().0 <= sample_rate
                && range.max_sample_rate().0 >= sample_rate
            {
                selected = Some(range.with_sample_rate(cpal::SampleRate(sample_rate)));
                break;
            }
        }
        let config = selected.ok_or_else(|| {
            CaptureError::Unsupported(format!("no mono input at {}Hz", sample_rate))
        })?;

        info!("Audio Config Selected: Rate={}Hz, Format={:?}", sample_rate, config.sample_format());

        let (mut producer, consumer) = HeapRb::<i16>::new(RING_CAPACITY).split();
        let stream_error = Arc::new(Mutex::new(None));
        let err_slot = stream_error.clone();
        let err_fn = move |err: cpal::StreamError| {
            error!("an error occurred on stream: {}", err);
            if let Ok(mut slot) = err_slot.lock() {
                *slot = Some(err.to_string());
            }
        };

        let stream = match config.sample_format() {
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config.into(),
                move |data: &[i16], _: &_| write_input_data(data, &mut producer),
                err_fn,
                None,
            ),
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &_| write_input_data_f32(data, &mut producer),
                err_fn,
                None,
            ),
            other => return Err(CaptureError::Unsupported(format!("sample format {:?}", other))),
        }
        .map_err(|e| CaptureError::Stream(e.to_string()))?;

        stream.play().map_err(|e| CaptureError::Stream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            consumer,
            sample_rate,
            stream_error,
        })
    }

    fn take_stream_error(&self) -> Option<String> {
        self.stream_error.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl FrameSource for AudioCapture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn read_frame(&mut self, frame: &mut [i16]) -> Result<(), CaptureError> {
        loop {
            if let Some(err) = self.take_stream_error() {
                return Err(CaptureError::Stream(err));
            }
            if self.consumer.occupied_len() >= frame.len() {
                self.consumer.pop_slice(frame);
                return Ok(());
            }
            tokio::time::sleep(POLL_SLEEP).await;
        }
    }

    fn discard_buffered(&mut self) {
        let stale = self.consumer.occupied_len();
        self.consumer.skip(stale);
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        info!("Audio capture released");
    }
}

// A full ring drops the newest samples (lossy).
fn write_input_data(input: &[i16], producer: &mut HeapProd<i16>) {
    producer.push_slice(input);
}

fn write_input_data_f32(input: &[f32], producer: &mut HeapProd<i16>) {
    for &sample in input {
        let _ = producer.try_push((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
    }
}
