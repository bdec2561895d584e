use thiserror::Error;

// Enum for handling engine-level errors. State mutation itself never fails
// (clamping is the recovery strategy); these cover persistence and settings.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error), // Errors related to state/settings serialization.

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error), // Input/output errors.
}

// Errors from the speech collaborator are separated into their own enum: the
// engine is unaffected by any of them.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("No text to speak")]
    EmptyInput, // Fail fast on empty input, no partial synthesis.

    #[error("Speed {0} is outside the supported range 0.25..=4.0")]
    SpeedOutOfRange(f32),

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error("Unknown audio format: {0}")]
    UnknownFormat(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError), // Errors from the OpenAI API.

    #[error("No audio player found")]
    NoPlayer, // No usable output device on this host.

    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}
