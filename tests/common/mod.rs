#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fred_drawers::audio::{CaptureError, FrameSource, Utterance, WakeError, WakeWordEngine};
use fred_drawers::device::SerialTransport;
use fred_drawers::kernel::TagSignalStore;
use fred_drawers::services::stt::{RecognitionError, SpeechToText};

pub const RATE: u32 = 16_000;
pub const CHUNK: usize = 1024;
pub const SPEECH: i16 = 3000;

/// Ordered record of what crossed the wire and what was read from the mic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Sent(String),
    FrameRead(usize),
}

pub type Journal = Arc<Mutex<Vec<Event>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug, Clone)]
enum Reply {
    Line { text: String, delay: Duration },
    Silent,
}

#[derive(Default)]
struct TransportState {
    written: Vec<String>,
    replies: HashMap<String, VecDeque<Reply>>,
    pending: Option<(Vec<u8>, tokio::time::Instant)>,
    fail_writes: bool,
}

/// In-memory stand-in for the Arduino.
///
/// Every token gets "ok\r\n" right away unless a reply was scripted for it.
/// Clones share state, so a test keeps one clone for inspection.
#[derive(Clone)]
pub struct ScriptedTransport {
    state: Arc<Mutex<TransportState>>,
    journal: Option<Journal>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TransportState::default())),
            journal: None,
        }
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::new()
        }
    }

    pub fn reply(&self, token: &str, text: &str, delay: Duration) {
        self.push(token, Reply::Line { text: text.to_string(), delay });
    }

    pub fn silent(&self, token: &str) {
        self.push(token, Reply::Silent);
    }

    pub fn fail_writes(&self) {
        self.state.lock().unwrap().fail_writes = true;
    }

    pub fn written(&self) -> Vec<String> {
        self.state.lock().unwrap().written.clone()
    }

    fn push(&self, token: &str, reply: Reply) {
        self.state
            .lock()
            .unwrap()
            .replies
            .entry(token.to_string())
            .or_default()
            .push_back(reply);
    }
}

impl SerialTransport for ScriptedTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        let token = String::from_utf8_lossy(bytes).to_string();
        state.written.push(token.clone());
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(Event::Sent(token.clone()));
        }

        let reply = state
            .replies
            .get_mut(&token)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Reply::Line { text: "ok".to_string(), delay: Duration::ZERO });
        state.pending = match reply {
            Reply::Line { text, delay } => {
                Some((format!("{}\r\n", text).into_bytes(), tokio::time::Instant::now() + delay))
            }
            Reply::Silent => None,
        };
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let state = self.state.lock().unwrap();
        Ok(match &state.pending {
            Some((bytes, ready_at)) if tokio::time::Instant::now() >= *ready_at => bytes.len(),
            _ => 0,
        })
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        Ok(state.pending.take().map(|(bytes, _)| bytes).unwrap_or_default())
    }
}

/// Scripted microphone. Plays queued samples, then silence, then fails with `Closed`
/// once `silence_budget` samples of trailing silence are used up.
pub struct ScriptedFrames {
    queue: VecDeque<i16>,
    silence_budget: Option<usize>,
    journal: Option<Journal>,
    released: Arc<AtomicBool>,
}

impl ScriptedFrames {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            silence_budget: None,
            journal: None,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Stop with `CaptureError::Closed` after this much trailing silence.
    pub fn close_after(mut self, silence: Duration) -> Self {
        self.silence_budget = Some(seconds_to_samples(silence));
        self
    }

    pub fn silence(mut self, duration: Duration) -> Self {
        self.queue.extend(std::iter::repeat(0).take(seconds_to_samples(duration)));
        self
    }

    pub fn silence_samples(mut self, count: usize) -> Self {
        self.queue.extend(std::iter::repeat(0).take(count));
        self
    }

    pub fn speech(mut self, duration: Duration) -> Self {
        self.queue.extend(std::iter::repeat(SPEECH).take(seconds_to_samples(duration)));
        self
    }

    /// One spoken turn: a calibration second of silence, a one-second phrase, a pause.
    pub fn turn(self) -> Self {
        self.silence_samples(15 * CHUNK)
            .speech(Duration::from_secs(1))
            .silence(Duration::from_secs(1))
    }

    pub fn released_flag(&self) -> Arc<AtomicBool> {
        self.released.clone()
    }
}

impl FrameSource for ScriptedFrames {
    fn sample_rate(&self) -> u32 {
        RATE
    }

    async fn read_frame(&mut self, frame: &mut [i16]) -> Result<(), CaptureError> {
        for slot in frame.iter_mut() {
            *slot = match self.queue.pop_front() {
                Some(sample) => sample,
                None => match &mut self.silence_budget {
                    Some(0) => return Err(CaptureError::Closed),
                    Some(left) => {
                        *left -= 1;
                        0
                    }
                    None => 0,
                },
            };
        }
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(Event::FrameRead(frame.len()));
        }
        Ok(())
    }
}

impl Drop for ScriptedFrames {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Wake-word engine that fires on scripted frame numbers.
pub struct ScriptedEngine {
    indices: VecDeque<i32>,
    rate: u32,
    fail_after: Option<usize>,
    processed: usize,
    released: Arc<AtomicBool>,
}

impl ScriptedEngine {
    pub fn new(indices: &[i32]) -> Self {
        Self {
            indices: indices.iter().copied().collect(),
            rate: RATE,
            fail_after: None,
            processed: 0,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn at_rate(mut self, rate: u32) -> Self {
        self.rate = rate;
        self
    }

    pub fn fail_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    pub fn released_flag(&self) -> Arc<AtomicBool> {
        self.released.clone()
    }
}

impl WakeWordEngine for ScriptedEngine {
    fn sample_rate(&self) -> u32 {
        self.rate
    }

    fn frame_length(&self) -> usize {
        512
    }

    fn process(&mut self, _frame: &[i16]) -> Result<i32, WakeError> {
        if self.fail_after == Some(self.processed) {
            return Err(WakeError::Process("model crashed".into()));
        }
        self.processed += 1;
        Ok(self.indices.pop_front().unwrap_or(-1))
    }
}

impl Drop for ScriptedEngine {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Speech service returning queued results; unintelligible once the queue runs dry.
#[derive(Clone)]
pub struct ScriptedRecognizer {
    results: Arc<Mutex<VecDeque<Result<String, RecognitionError>>>>,
    calls: Arc<Mutex<Vec<(usize, String)>>>,
}

impl ScriptedRecognizer {
    pub fn new(results: Vec<Result<String, RecognitionError>>) -> Self {
        Self {
            results: Arc::new(Mutex::new(results.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn saying(phrases: &[&str]) -> Self {
        Self::new(phrases.iter().map(|p| Ok(p.to_string())).collect())
    }

    /// (sample count, language) per call.
    pub fn calls(&self) -> Vec<(usize, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SpeechToText for ScriptedRecognizer {
    async fn transcribe(&self, utterance: &Utterance, language: &str) -> Result<String, RecognitionError> {
        self.calls
            .lock()
            .unwrap()
            .push((utterance.samples.len(), language.to_string()));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(RecognitionError::Unintelligible))
    }
}

/// Tag store in memory, counting clears.
#[derive(Clone, Default)]
pub struct MemorySignal {
    content: Arc<Mutex<Option<String>>>,
    clears: Arc<Mutex<usize>>,
}

impl MemorySignal {
    pub fn assert_tag(&self, content: &str) {
        *self.content.lock().unwrap() = Some(content.to_string());
    }

    pub fn content(&self) -> Option<String> {
        self.content.lock().unwrap().clone()
    }

    pub fn clears(&self) -> usize {
        *self.clears.lock().unwrap()
    }
}

impl TagSignalStore for MemorySignal {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.content.lock().unwrap().clone())
    }

    fn clear(&self) -> io::Result<()> {
        *self.content.lock().unwrap() = Some(String::new());
        *self.clears.lock().unwrap() += 1;
        Ok(())
    }
}

pub fn seconds_to_samples(duration: Duration) -> usize {
    (duration.as_secs_f64() * RATE as f64) as usize
}
