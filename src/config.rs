//! Runtime settings from the environment (and `.env`, loaded by the binary).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::kernel::tag_watcher::DEFAULT_TAG_POLL;

const DEFAULT_SERIAL_PORT: &str = "/dev/ttyACM0";
const DEFAULT_SERIAL_BAUD: u32 = 9600;
const DEFAULT_STT_URL: &str = "http://www.google.com/speech-api/v2/recognize";
const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_SAMPLE_RATE: u32 = 16_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub serial_port: String,
    pub serial_baud: u32,
    /// Per-read timeout on the port while a reply line is being read.
    pub serial_read_timeout: Duration,
    /// Tag signal file. The tag watcher is disabled without one.
    pub tag_file: Option<PathBuf>,
    pub tag_poll_interval: Duration,
    /// Wake-word model files, comma separated in `KEYWORD_PATH`.
    pub keyword_paths: Vec<String>,
    pub sample_rate: u32,
    pub stt_url: String,
    pub stt_key: Option<String>,
    pub stt_timeout: Duration,
    pub language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_port: DEFAULT_SERIAL_PORT.to_string(),
            serial_baud: DEFAULT_SERIAL_BAUD,
            serial_read_timeout: Duration::from_secs(2),
            tag_file: None,
            tag_poll_interval: DEFAULT_TAG_POLL,
            keyword_paths: Vec::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            stt_url: DEFAULT_STT_URL.to_string(),
            stt_key: None,
            stt_timeout: Duration::from_secs(10),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Config::default();

        if let Some(port) = get("FRED_SERIAL_PORT") {
            config.serial_port = port;
        }
        if let Some(baud) = get("FRED_SERIAL_BAUD") {
            config.serial_baud = number("FRED_SERIAL_BAUD", &baud)?;
        }
        config.tag_file = get("NFC_FILE_PATH").map(PathBuf::from);
        if let Some(ms) = get("FRED_TAG_POLL_MS") {
            let ms: u64 = number("FRED_TAG_POLL_MS", &ms)?;
            if ms == 0 {
                return Err(ConfigError::Zero { key: "FRED_TAG_POLL_MS" });
            }
            config.tag_poll_interval = Duration::from_millis(ms);
        }
        if let Some(paths) = get("KEYWORD_PATH") {
            config.keyword_paths = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(rate) = get("FRED_SAMPLE_RATE") {
            config.sample_rate = number("FRED_SAMPLE_RATE", &rate)?;
        }
        if let Some(url) = get("FRED_STT_URL") {
            config.stt_url = url;
        }
        config.stt_key = get("FRED_STT_KEY");
        if let Some(language) = get("FRED_LANGUAGE") {
            config.language = language;
        }

        Ok(config)
    }
}

fn number<N: FromStr>(key: &'static str, value: &str) -> Result<N, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
    })
}
