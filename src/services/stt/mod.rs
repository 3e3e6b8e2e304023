pub mod client;

pub use client::{HttpRecognizer, RecognitionError, SpeechToText};
