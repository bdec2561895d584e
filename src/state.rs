use crate::error::EngineError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use strum_macros::{Display, EnumString};

/// Hard cap on remembered retractions: only the last 5 are kept.
pub const RETRACTION_MEMORY_CAP: usize = 5;

// A named hidden dimension. The classifier emits deltas against these; the
// store is the only place they are ever summed and clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Dimension {
    Warmth,         // -5..=5: 冷淡 ↔ 温暖
    Tension,        // 0..=10: 暧昧张力
    Trust,          // 0..=10
    Disappointment, // 0..=10
    Need,           // 0..=10
    Rhythm,         // 0..=10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDelta {
    pub dimension: Dimension,
    pub amount: i32,
}

impl StateDelta {
    pub fn new(dimension: Dimension, amount: i32) -> Self {
        StateDelta { dimension, amount }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Sentiment {
    None,
    Positive,
    Negative,
    Romantic,
}

impl Sentiment {
    pub fn is_bearing(&self) -> bool {
        !matches!(self, Sentiment::None)
    }
}

// A retraction the other side may have glimpsed before it was withdrawn.
// Influence fades turn by turn; the entry is dropped when it reaches zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetractionMemory {
    pub content_preview: String,
    pub visible_ms: u64,
    pub detected_sentiment: Sentiment,
    pub turns_remaining_influence: u32,
}

// Derived mode markers, surfaced for logging and for the narrator layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SpecialState {
    Distancing, // 疏远模式
    HighAlert,
    Cold,
}

/// The hidden emotional state of one conversation. Never serialized into the
/// rendered transcript; the only state-derived data crossing the boundary is
/// `DisplayState` and the annotation stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub warmth: i32,
    pub tension: i32,
    pub trust: i32,
    pub disappointment: i32,
    pub need: i32,
    pub rhythm: i32,

    /// Consecutive-day contact streak.
    #[serde(default)]
    pub consecutive_days: u32,
    /// User turns in a row that got no reply (withheld or minimal).
    #[serde(default)]
    pub unanswered_user_turns: u32,
    /// Last outgoing activity (her side).
    pub last_active_at: Option<DateTime<Local>>,
    /// Last time an incoming message was marked read.
    pub last_read_at: Option<DateTime<Local>>,
    #[serde(default)]
    pub pending_retractions: Vec<RetractionMemory>,
    /// Past warmth snapshots, oldest first. Display reads from here, so the
    /// shown temperature trails true state by the buffer depth.
    #[serde(default)]
    pub display_lag_buffer: VecDeque<i32>,
}

impl Default for ConversationState {
    fn default() -> Self {
        ConversationState {
            warmth: 0,
            tension: 0,
            trust: 0,
            disappointment: 0,
            need: 3,
            rhythm: 5,
            consecutive_days: 0,
            unanswered_user_turns: 0,
            last_active_at: None,
            last_read_at: None,
            pending_retractions: Vec::new(),
            display_lag_buffer: VecDeque::new(),
        }
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    // Every bounded dimension back into its declared closed range. Mutations
    // go through apply_deltas, which always ends here.
    pub fn clamp(&mut self) {
        self.warmth = self.warmth.clamp(-5, 5);
        self.tension = self.tension.clamp(0, 10);
        self.trust = self.trust.clamp(0, 10);
        self.disappointment = self.disappointment.clamp(0, 10);
        self.need = self.need.clamp(0, 10);
        self.rhythm = self.rhythm.clamp(0, 10);
    }

    /// Sum each delta into its dimension, then clamp. Pushes the pre-mutation
    /// warmth into the lag buffer, evicting the oldest entry past `lag_depth`.
    /// Out-of-range input is recovered by clamping, never an error.
    pub fn apply_deltas(&mut self, deltas: &[StateDelta], lag_depth: usize) {
        self.display_lag_buffer.push_back(self.warmth);
        while self.display_lag_buffer.len() > lag_depth {
            self.display_lag_buffer.pop_front();
        }

        for delta in deltas {
            let slot = match delta.dimension {
                Dimension::Warmth => &mut self.warmth,
                Dimension::Tension => &mut self.tension,
                Dimension::Trust => &mut self.trust,
                Dimension::Disappointment => &mut self.disappointment,
                Dimension::Need => &mut self.need,
                Dimension::Rhythm => &mut self.rhythm,
            };
            *slot += delta.amount;
            log::debug!("delta {}{:+}", delta.dimension, delta.amount);
        }

        self.clamp();
    }

    /// The warmth value the display layer is allowed to see: the oldest
    /// snapshot still in the buffer, or live warmth while the buffer fills.
    pub fn lagged_warmth(&self) -> i32 {
        self.display_lag_buffer.front().copied().unwrap_or(self.warmth)
    }

    /// Record a glimpsed retraction, most recent last, bounded to the cap.
    pub fn remember_retraction(&mut self, memory: RetractionMemory) {
        self.pending_retractions.push(memory);
        while self.pending_retractions.len() > RETRACTION_MEMORY_CAP {
            self.pending_retractions.remove(0);
        }
    }

    /// Decrement each retraction's remaining influence; entries at zero are
    /// forgotten. Called once per turn.
    pub fn tick_retraction_influence(&mut self) {
        for memory in &mut self.pending_retractions {
            memory.turns_remaining_influence = memory.turns_remaining_influence.saturating_sub(1);
        }
        self.pending_retractions
            .retain(|memory| memory.turns_remaining_influence > 0);
    }

    /// True while any remembered retraction still colors her replies.
    pub fn under_retraction_influence(&self) -> bool {
        !self.pending_retractions.is_empty()
    }

    pub fn special_states(&self) -> Vec<SpecialState> {
        let mut states = Vec::new();
        if self.disappointment >= 7 {
            states.push(SpecialState::Distancing);
        }
        if self.tension >= 8 {
            states.push(SpecialState::HighAlert);
        }
        if self.warmth <= -3 {
            states.push(SpecialState::Cold);
        }
        states
    }

    pub fn load_from_file(path: &str) -> Result<Self, EngineError> {
        let file = std::fs::File::open(path)?;
        let state: ConversationState = serde_json::from_reader(file)?;
        Ok(state)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), EngineError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
