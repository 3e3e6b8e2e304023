use hound::{SampleFormat, WavSpec, WavWriter};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

use crate::audio::Utterance;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    /// The service answered but could not make out any words.
    #[error("speech was unintelligible")]
    Unintelligible,

    /// The service could not be reached or refused the request.
    #[error("recognition request failed: {0}")]
    Service(String),
}

/// Turns one captured utterance into text.
pub trait SpeechToText {
    fn transcribe(
        &self,
        utterance: &Utterance,
        language: &str,
    ) -> impl Future<Output = Result<String, RecognitionError>>;
}

#[derive(Deserialize)]
struct RecognitionChunk {
    #[serde(default)]
    result: Vec<RecognitionResult>,
}

#[derive(Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternative: Vec<Alternative>,
}

#[derive(Deserialize)]
struct Alternative {
    transcript: String,
}

/// Client for a speech API speaking the `speech-api/v2` wire format.
#[derive(Clone)]
pub struct HttpRecognizer {
    client: Client,
    endpoint: String,
    key: Option<String>,
}

impl HttpRecognizer {
    pub fn new(endpoint: impl Into<String>, key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            key,
        }
    }
}

impl SpeechToText for HttpRecognizer {
    async fn transcribe(&self, utterance: &Utterance, language: &str) -> Result<String, RecognitionError> {
        let body = encode_wav(utterance).map_err(|e| RecognitionError::Service(e.to_string()))?;

        let mut query = vec![("client", "chromium"), ("lang", language), ("output", "json")];
        if let Some(key) = &self.key {
            query.push(("key", key.as_str()));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .query(&query)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("audio/wav; rate={}", utterance.sample_rate),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| RecognitionError::Service(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RecognitionError::Service(format!("recognition server error: {}", response.status())));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RecognitionError::Service(e.to_string()))?;
        debug!("Recognition response: {} bytes", text.len());
        parse_transcript(&text)
    }
}

/// Picks the first transcript out of a line-delimited JSON response.
///
/// The service usually sends an empty `{"result":[]}` line before the real one.
pub fn parse_transcript(body: &str) -> Result<String, RecognitionError> {
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let chunk: RecognitionChunk = serde_json::from_str(line)
            .map_err(|e| RecognitionError::Service(format!("malformed response: {}", e)))?;
        let transcript = chunk
            .result
            .into_iter()
            .flat_map(|r| r.alternative)
            .map(|a| a.transcript)
            .find(|t| !t.trim().is_empty());
        if let Some(text) = transcript {
            return Ok(text.trim().to_string());
        }
    }
    Err(RecognitionError::Unintelligible)
}

/// 16-bit mono WAV in memory.
pub fn encode_wav(utterance: &Utterance) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: utterance.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in &utterance.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
