use crate::classifier::{self, GameEvent};
use crate::display::{self, DisplayState};
use crate::markup::{self, Annotation};
use crate::pacing::{self, PacingDecision};
use crate::settings::EngineSettings;
use crate::state::ConversationState;
use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};

/// One conversational turn as submitted by the game client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnInput {
    pub user_text: String,
    #[serde(default)]
    pub events: Vec<GameEvent>,
    pub now: DateTime<Local>,
}

impl TurnInput {
    pub fn text(user_text: impl Into<String>, now: DateTime<Local>) -> Self {
        TurnInput {
            user_text: user_text.into(),
            events: Vec::new(),
            now,
        }
    }
}

/// What goes back to the client: the annotated response plus the raw
/// decision and projection for clients that want structured access.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub response_text: String,
    pub annotations: Vec<Annotation>,
    pub decision: PacingDecision,
    pub display: DisplayState,
}

/// One conversation: a single sequential state machine. A turn is fully
/// classified, applied and projected before the next one is accepted;
/// separate conversations share nothing.
#[derive(Debug)]
pub struct Conversation {
    state: ConversationState,
    settings: EngineSettings,
    turn: u64,
    pending_decision: bool,
}

impl Conversation {
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_state(ConversationState::new(), settings)
    }

    pub fn with_state(state: ConversationState, mut settings: EngineSettings) -> Self {
        settings.normalize();
        Conversation {
            state,
            settings,
            turn: 0,
            pending_decision: false,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn into_state(self) -> ConversationState {
        self.state
    }

    pub fn turn_count(&self) -> u64 {
        self.turn
    }

    /// Process one turn. `response_text` is the reply the narrator produced
    /// for this turn; the engine decides how it is delivered, not what it
    /// says. A decision still pending from the previous turn is abandoned
    /// here: partially elapsed delay time is discarded, never resumed.
    pub fn process_turn(&mut self, input: &TurnInput, response_text: &str) -> TurnOutput {
        if self.pending_decision {
            log::debug!("new turn arrived mid-delay; abandoning pending decision");
            self.pending_decision = false;
        }

        self.update_streak(input.now);

        let classified =
            classifier::classify(&input.user_text, &input.events, input.now, &self.state);

        self.state
            .apply_deltas(&classified.deltas, self.settings.lag_depth);
        for memory in classified.memories.iter().cloned() {
            self.state.remember_retraction(memory);
        }
        self.state.tick_retraction_influence();
        self.state.last_read_at = Some(input.now);

        self.turn += 1;
        let decision = pacing::decide(&self.state, &classified.flags, response_text, self.turn);

        if decision.withhold {
            self.state.unanswered_user_turns += 1;
        } else {
            self.state.unanswered_user_turns = 0;
            // Her reply is the outgoing activity.
            self.state.last_active_at = Some(input.now);
        }

        let display = display::project(&self.state, input.now, !decision.withhold);

        let retraction_ack = if classified.flags.retraction_seen {
            Some((!classified.memories.is_empty(), classified.retraction_tension))
        } else {
            None
        };
        let debug_state = self
            .settings
            .debug_state_annotations
            .then_some(&self.state);

        let body = if decision.withhold { "" } else { response_text };
        let (annotated, annotations) =
            markup::annotate(body, &decision, &display, retraction_ack, debug_state);

        log::debug!(
            "turn {}: mode={} typing={}ms read={}ms withhold={}",
            self.turn,
            decision.mode,
            decision.typing_duration_ms,
            decision.read_delay_ms,
            decision.withhold
        );

        self.pending_decision = true;
        TurnOutput {
            response_text: annotated,
            annotations,
            decision,
            display,
        }
    }

    // Consecutive-day bookkeeping for the consistent_daily rule.
    fn update_streak(&mut self, now: DateTime<Local>) {
        match self.state.last_read_at {
            Some(last) => {
                let gap_days =
                    now.date_naive().num_days_from_ce() - last.date_naive().num_days_from_ce();
                if gap_days == 1 {
                    self.state.consecutive_days += 1;
                } else if gap_days > 1 {
                    self.state.consecutive_days = 1;
                }
            }
            None => self.state.consecutive_days = 1,
        }
    }
}
