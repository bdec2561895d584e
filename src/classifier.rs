use crate::state::{ConversationState, Dimension, RetractionMemory, Sentiment, StateDelta};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

// Keyword tables for pattern matching over the incoming text. Chinese first
// (the game is played in Chinese), with a few English equivalents.
const CONFESSION_KEYWORDS: &[&str] = &[
    "喜欢你",
    "爱你",
    "在一起吧",
    "表白",
    "做我女朋友",
    "做我男朋友",
    "i like you",
    "i love you",
    "be my girlfriend",
];
const AMBIGUOUS_KEYWORDS: &[&str] = &[
    "想你",
    "想见你",
    "晚安",
    "早安",
    "吃饭了吗",
    "在干嘛",
    "miss you",
    "good night",
];
const FEELINGS_KEYWORDS: &[&str] = &["你对我", "你觉得我", "喜不喜欢", "什么感觉", "how do you feel about me"];
const CARE_KEYWORDS: &[&str] = &["多喝水", "早点睡", "注意身体", "别累着", "take care", "rest well"];

const ROMANTIC_SENTIMENT: &[&str] = &["喜欢", "想你", "想见", "在一起", "love", "miss you"];
const NEGATIVE_SENTIMENT: &[&str] = &["讨厌", "烦", "对不起", "hate", "sorry"];
const POSITIVE_SENTIMENT: &[&str] = &["谢谢", "开心", "哈哈", "thank"];

/// A message the user withdrew; the game client reports how long it stayed
/// visible before removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetractionEvent {
    pub visible_ms: u64,
    pub content_preview: Option<String>,
    pub retracted_at: DateTime<Local>,
}

// Structured events the game layer injects alongside the message text. Most
// are observations the engine cannot derive from text alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEvent {
    Retraction(RetractionEvent),
    RememberedDetail,
    ForgotDetail,
    SharedPersonal,
    ObviousDismissal,
    InconsistentStory,
    MissedEmotion,
    SelfCentered,
    PatientWaiting,
}

/// Visibility bands for a retraction. Disjoint: below 3000ms the message
/// counts as unseen and leaves no trace at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetractionBand {
    Unseen,
    Glimpsed,
    Read,
}

pub fn band_retraction(event: &RetractionEvent) -> RetractionBand {
    // A retraction with no preview cannot be interpreted; take the
    // conservative branch and treat it as unseen.
    let preview = match &event.content_preview {
        Some(preview) if !preview.is_empty() => preview,
        _ => return RetractionBand::Unseen,
    };
    if event.visible_ms < 3000 {
        RetractionBand::Unseen
    } else if event.visible_ms < 5000 || !detect_sentiment(preview).is_bearing() {
        RetractionBand::Glimpsed
    } else {
        RetractionBand::Read
    }
}

pub fn detect_sentiment(text: &str) -> Sentiment {
    let lowered = text.to_lowercase();
    if ROMANTIC_SENTIMENT.iter().any(|kw| lowered.contains(kw)) {
        Sentiment::Romantic
    } else if NEGATIVE_SENTIMENT.iter().any(|kw| lowered.contains(kw)) {
        Sentiment::Negative
    } else if POSITIVE_SENTIMENT.iter().any(|kw| lowered.contains(kw)) {
        Sentiment::Positive
    } else {
        Sentiment::None
    }
}

// What one turn looks like once text, game events and elapsed time are
// flattened into booleans the rule table can match on.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnObservation {
    pub confession: bool,
    pub ambiguous: bool,
    pub asked_feelings: bool,
    pub showed_care: bool,
    pub streak_continued: bool,
    pub gap_over_24h: bool,
    pub eager_push: bool,
    pub remembered_detail: bool,
    pub forgot_detail: bool,
    pub shared_personal: bool,
    pub obvious_dismissal: bool,
    pub inconsistent_story: bool,
    pub missed_emotion: bool,
    pub self_centered: bool,
    pub patient_waiting: bool,
}

/// Flags the downstream pacing branch keys on. The confession coupling is
/// deliberately explicit here rather than implicit in timing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFlags {
    pub confession: bool,
    pub romantic: bool,
    pub question: bool,
    pub retraction_seen: bool,
    pub multi_retraction: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RuleTag {
    ConsistentDaily,
    RememberedDetail,
    PatientWaiting,
    SharedPersonal,
    ShowedCare,
    EagerPush,
    Disappeared24h,
    ObviousDismissal,
    InconsistentStory,
    ForgotDetail,
    MissedEmotion,
    SelfCentered,
    SaidAmbiguous,
    AskedFeelings,
    Confession,
    NormalChat,
}

/// One classifier rule: a tag, a predicate over the observation, and the
/// delta set it contributes. All matching rules apply additively.
pub struct Rule {
    pub tag: RuleTag,
    pub applies: fn(&TurnObservation) -> bool,
    pub deltas: &'static [(Dimension, i32)],
}

pub const RULES: &[Rule] = &[
    Rule {
        tag: RuleTag::ConsistentDaily,
        applies: |o| o.streak_continued,
        deltas: &[(Dimension::Warmth, 1), (Dimension::Trust, 1), (Dimension::Rhythm, 1)],
    },
    Rule {
        tag: RuleTag::RememberedDetail,
        applies: |o| o.remembered_detail,
        deltas: &[(Dimension::Warmth, 2), (Dimension::Trust, 1), (Dimension::Need, 1)],
    },
    Rule {
        tag: RuleTag::PatientWaiting,
        applies: |o| o.patient_waiting,
        deltas: &[(Dimension::Warmth, 1), (Dimension::Rhythm, 1)],
    },
    Rule {
        tag: RuleTag::SharedPersonal,
        applies: |o| o.shared_personal,
        deltas: &[(Dimension::Trust, 1), (Dimension::Warmth, 1)],
    },
    Rule {
        tag: RuleTag::ShowedCare,
        applies: |o| o.showed_care,
        deltas: &[(Dimension::Warmth, 1), (Dimension::Need, 1)],
    },
    Rule {
        tag: RuleTag::EagerPush,
        applies: |o| o.eager_push,
        deltas: &[(Dimension::Warmth, -1), (Dimension::Tension, 2), (Dimension::Rhythm, -1)],
    },
    Rule {
        tag: RuleTag::Disappeared24h,
        applies: |o| o.gap_over_24h,
        deltas: &[(Dimension::Warmth, -1), (Dimension::Disappointment, 1)],
    },
    Rule {
        tag: RuleTag::ObviousDismissal,
        applies: |o| o.obvious_dismissal,
        deltas: &[(Dimension::Warmth, -2), (Dimension::Trust, -1)],
    },
    Rule {
        tag: RuleTag::InconsistentStory,
        applies: |o| o.inconsistent_story,
        deltas: &[(Dimension::Trust, -2)],
    },
    Rule {
        tag: RuleTag::ForgotDetail,
        applies: |o| o.forgot_detail,
        deltas: &[(Dimension::Disappointment, 2), (Dimension::Need, -1)],
    },
    Rule {
        tag: RuleTag::MissedEmotion,
        applies: |o| o.missed_emotion,
        deltas: &[(Dimension::Disappointment, 1)],
    },
    Rule {
        tag: RuleTag::SelfCentered,
        applies: |o| o.self_centered,
        deltas: &[(Dimension::Disappointment, 1), (Dimension::Warmth, -1)],
    },
    Rule {
        tag: RuleTag::SaidAmbiguous,
        applies: |o| o.ambiguous,
        deltas: &[(Dimension::Tension, 2)],
    },
    Rule {
        tag: RuleTag::AskedFeelings,
        applies: |o| o.asked_feelings,
        deltas: &[(Dimension::Tension, 1)],
    },
    Rule {
        tag: RuleTag::Confession,
        applies: |o| o.confession,
        deltas: &[(Dimension::Tension, 5)],
    },
];

// The fallback when nothing else matched: ordinary chat lets tension bleed
// off and the rhythm settle.
pub const NORMAL_CHAT_DELTAS: &[(Dimension, i32)] = &[(Dimension::Tension, -1), (Dimension::Rhythm, 1)];

/// Everything the store and the pacing layer need from one classified turn.
#[derive(Debug, Clone)]
pub struct ClassifiedTurn {
    pub deltas: Vec<StateDelta>,
    pub matched: Vec<RuleTag>,
    pub flags: EventFlags,
    pub memories: Vec<RetractionMemory>,
    /// Net tension contributed by retraction handling, for the acknowledgement
    /// annotation.
    pub retraction_tension: i32,
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|kw| lowered.contains(kw))
}

pub fn observe(
    user_text: &str,
    events: &[GameEvent],
    now: DateTime<Local>,
    state: &ConversationState,
) -> TurnObservation {
    let confession = contains_any(user_text, CONFESSION_KEYWORDS);
    let mut observation = TurnObservation {
        confession,
        // Confession outranks ambiguity; the same phrase never fires both.
        ambiguous: !confession && contains_any(user_text, AMBIGUOUS_KEYWORDS),
        asked_feelings: !confession && contains_any(user_text, FEELINGS_KEYWORDS),
        showed_care: contains_any(user_text, CARE_KEYWORDS),
        streak_continued: state.consecutive_days >= 2,
        eager_push: state.unanswered_user_turns >= 2,
        ..TurnObservation::default()
    };

    if let Some(last) = state.last_active_at {
        observation.gap_over_24h = now.signed_duration_since(last).num_hours() > 24;
    }

    for event in events {
        match event {
            GameEvent::Retraction(_) => {} // banded separately below
            GameEvent::RememberedDetail => observation.remembered_detail = true,
            GameEvent::ForgotDetail => observation.forgot_detail = true,
            GameEvent::SharedPersonal => observation.shared_personal = true,
            GameEvent::ObviousDismissal => observation.obvious_dismissal = true,
            GameEvent::InconsistentStory => observation.inconsistent_story = true,
            GameEvent::MissedEmotion => observation.missed_emotion = true,
            GameEvent::SelfCentered => observation.self_centered = true,
            GameEvent::PatientWaiting => observation.patient_waiting = true,
        }
    }

    observation
}

/// Map one conversational turn to its delta set. Ties resolve by summation:
/// every matching rule contributes, none is picked over another.
pub fn classify(
    user_text: &str,
    events: &[GameEvent],
    now: DateTime<Local>,
    state: &ConversationState,
) -> ClassifiedTurn {
    let observation = observe(user_text, events, now, state);

    let mut deltas: Vec<StateDelta> = Vec::new();
    let mut matched: Vec<RuleTag> = Vec::new();

    for rule in RULES {
        if (rule.applies)(&observation) {
            matched.push(rule.tag);
            deltas.extend(
                rule.deltas
                    .iter()
                    .map(|&(dimension, amount)| StateDelta::new(dimension, amount)),
            );
        }
    }

    // Retraction banding on visibility duration.
    let mut memories: Vec<RetractionMemory> = Vec::new();
    let mut retraction_tension = 0;
    let mut seen_retractions = 0u32;
    for event in events {
        let GameEvent::Retraction(retraction) = event else {
            continue;
        };
        let band = band_retraction(retraction);
        if band == RetractionBand::Unseen {
            continue;
        }
        seen_retractions += 1;
        let preview = retraction.content_preview.clone().unwrap_or_default();
        let sentiment = detect_sentiment(&preview);
        let (tension, influence) = match band {
            RetractionBand::Glimpsed => (2, 3),
            RetractionBand::Read => (4, 4),
            RetractionBand::Unseen => unreachable!(),
        };
        retraction_tension += tension;
        memories.push(RetractionMemory {
            content_preview: truncate_chars(&preview, 50),
            visible_ms: retraction.visible_ms,
            detected_sentiment: sentiment,
            turns_remaining_influence: influence,
        });
    }
    // Several retractions in one window read as one flustered moment, not a
    // stack: collapse to a single +3.
    if seen_retractions >= 2 {
        retraction_tension = 3;
    }
    if retraction_tension != 0 {
        deltas.push(StateDelta::new(Dimension::Tension, retraction_tension));
    }

    if matched.is_empty() && seen_retractions == 0 {
        matched.push(RuleTag::NormalChat);
        deltas.extend(
            NORMAL_CHAT_DELTAS
                .iter()
                .map(|&(dimension, amount)| StateDelta::new(dimension, amount)),
        );
    }

    let flags = EventFlags {
        confession: observation.confession,
        romantic: observation.ambiguous,
        question: user_text.contains('？') || user_text.contains('?'),
        retraction_seen: seen_retractions > 0,
        multi_retraction: seen_retractions >= 2,
    };

    log::debug!("classified turn: matched={:?} flags={:?}", matched, flags);

    ClassifiedTurn {
        deltas,
        matched,
        flags,
        memories,
        retraction_tension,
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
