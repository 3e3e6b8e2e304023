use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::state::{SessionEvent, SessionGraph, SessionState};
use crate::audio::{CaptureError, FrameSource, ListenError, Utterance, UtteranceListener};
use crate::device::{Command, DeviceLink, PollBudget, SerialTransport};
use crate::intent::{Intent, IntentParser};
use crate::services::stt::{RecognitionError, SpeechToText};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Language tag handed to the speech service.
    pub language: String,
    /// Poll budget for every device exchange made on behalf of a voice session.
    pub budget: PollBudget,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            budget: PollBudget::VOICE,
        }
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Speech never started within the onset timeout.
    NoSpeech,
    Unintelligible,
    ServiceError(String),
    Cancelled,
}

/// Sends intents and status notifications over the shared link.
///
/// Link failures are logged and folded into the report; they never end a session.
pub struct Dispatcher<T: SerialTransport> {
    link: Arc<DeviceLink<T>>,
    budget: PollBudget,
}

impl<T: SerialTransport> Dispatcher<T> {
    pub fn new(link: Arc<DeviceLink<T>>, budget: PollBudget) -> Self {
        Self { link, budget }
    }

    /// Status notification for the LCD. The reply only matters for the log.
    pub async fn notify(&self, command: Command) {
        match self.link.send(&command, self.budget).await {
            Ok(response) => debug!("'{}' acknowledged: {}", command, response),
            Err(e) => warn!("Notification '{}' failed: {}", command, e),
        }
    }

    /// Sends every command of `intent` in order and joins the replies with " and ".
    ///
    /// Returns `None` for `Intent::Invalid`; the device is not contacted.
    pub async fn dispatch(&self, intent: Intent) -> Option<String> {
        let commands = intent.commands();
        if commands.is_empty() {
            return None;
        }

        info!("{}", intent.describe());
        let mut replies = Vec::with_capacity(commands.len());
        for command in &commands {
            let reply = match self.link.send(command, self.budget).await {
                Ok(response) => response.to_string(),
                Err(e) => {
                    warn!("Command '{}' failed: {}", command, e);
                    e.to_string()
                }
            };
            replies.push(reply);
        }
        Some(replies.join(" and "))
    }
}

/// One wake-word-triggered conversation.
///
/// Borrows the wake loop's audio source and listener; runs until speech stops
/// arriving or recognition fails. An unparseable phrase only re-prompts.
pub struct VoiceSession<'a, F, S, T>
where
    F: FrameSource,
    S: SpeechToText,
    T: SerialTransport,
{
    source: &'a mut F,
    listener: &'a mut UtteranceListener,
    recognizer: &'a S,
    dispatcher: Dispatcher<T>,
    parser: IntentParser,
    language: String,
    shutdown: CancellationToken,
    state: SessionState,
}

impl<'a, F, S, T> VoiceSession<'a, F, S, T>
where
    F: FrameSource,
    S: SpeechToText,
    T: SerialTransport,
{
    pub fn new(
        source: &'a mut F,
        listener: &'a mut UtteranceListener,
        recognizer: &'a S,
        link: Arc<DeviceLink<T>>,
        config: &SessionConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source,
            listener,
            recognizer,
            dispatcher: Dispatcher::new(link, config.budget),
            parser: IntentParser::new(),
            language: config.language.clone(),
            shutdown,
            state: SessionState::Idle,
        }
    }

    /// Runs the session to its end. Only audio capture faults are returned as errors.
    pub async fn run(mut self) -> Result<SessionEnd, CaptureError> {
        let span = info_span!("session", id = %Uuid::new_v4());
        async move {
            self.advance(SessionEvent::WakeWordDetected);
            let end = self.converse().await;
            self.advance(SessionEvent::Shutdown);
            end
        }
        .instrument(span)
        .await
    }

    async fn converse(&mut self) -> Result<SessionEnd, CaptureError> {
        loop {
            if self.shutdown.is_cancelled() {
                return Ok(SessionEnd::Cancelled);
            }

            // --- Listening ---
            self.dispatcher.notify(Command::Listening).await;
            self.source.discard_buffered();

            let captured = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(SessionEnd::Cancelled),
                captured = capture(&mut *self.listener, &mut *self.source) => captured,
            };
            let utterance = match captured {
                Ok(utterance) => utterance,
                Err(ListenError::NoSpeech(waited)) => {
                    info!("No speech heard within {:?}", waited);
                    self.advance(SessionEvent::NoSpeech);
                    return Ok(SessionEnd::NoSpeech);
                }
                Err(ListenError::Capture(e)) => return Err(e),
            };
            self.advance(SessionEvent::UtteranceCaptured);

            // --- Recognizing ---
            self.dispatcher.notify(Command::Recognizing).await;
            let recognized = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(SessionEnd::Cancelled),
                recognized = self.recognizer.transcribe(&utterance, &self.language) => recognized,
            };
            let text = match recognized {
                Ok(text) => text,
                Err(RecognitionError::Unintelligible) => {
                    info!("Unable to understand audio");
                    self.dispatcher.notify(Command::Unintelligible).await;
                    self.advance(SessionEvent::Unintelligible);
                    return Ok(SessionEnd::Unintelligible);
                }
                Err(RecognitionError::Service(detail)) => {
                    warn!("Unable to request results; {}", detail);
                    self.dispatcher.notify(Command::RequestFailed(detail.clone())).await;
                    self.advance(SessionEvent::ServiceFailed);
                    return Ok(SessionEnd::ServiceError(detail));
                }
            };
            info!("You said: {}", text);
            self.advance(SessionEvent::Transcribed);

            // --- Dispatching ---
            let intent = self.parser.parse(&text);
            match self.dispatcher.dispatch(intent).await {
                Some(report) => info!("Arduino responded: {}", report),
                None => info!("{}", Intent::Invalid.describe()),
            }
            self.advance(SessionEvent::TurnComplete);
        }
    }

    fn advance(&mut self, event: SessionEvent) {
        match SessionGraph::transition(self.state, &event) {
            Some(next) => {
                debug!("Session {:?} --{:?}--> {:?}", self.state, event, next);
                self.state = next;
            }
            None => debug!("Ignored {:?} while {:?}", event, self.state),
        }
    }
}

/// Ambient calibration immediately followed by the phrase capture.
async fn capture<F: FrameSource>(
    listener: &mut UtteranceListener,
    source: &mut F,
) -> Result<Utterance, ListenError> {
    listener.adjust_for_ambient_noise(source).await?;
    listener.listen(source).await
}
