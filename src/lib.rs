pub mod classifier;
pub mod display;
pub mod error;
pub mod logging;
pub mod markup;
pub mod pacing;
pub mod session;
pub mod settings;
pub mod speech;
pub mod state;

// Re-export commonly used items for easier access
pub use classifier::{ClassifiedTurn, EventFlags, GameEvent, RetractionBand, RetractionEvent};
pub use display::{DisplayState, PresenceStatus, TemperatureIcon};
pub use error::{EngineError, SpeechError};
pub use markup::{Annotation, Directive, ParsedResponse};
pub use pacing::{EmotionalMode, PaceLevel, PacingDecision, PauseMark};
pub use session::{Conversation, TurnInput, TurnOutput};
pub use settings::EngineSettings;
pub use state::{ConversationState, Dimension, RetractionMemory, Sentiment, StateDelta};
