use crate::classifier::EventFlags;
use crate::state::ConversationState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Tone the character delivery runs in, derived from warmth and tension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EmotionalMode {
    Cold,
    Normal,
    Serious,
    Hesitant,
    Tense,
}

/// Coarse pace bucket carried in the annotation stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PaceLevel {
    Slow,
    Normal,
    Fast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseMark {
    /// Char offset into the response text (not bytes; the client streams
    /// per character).
    pub char_offset: usize,
    pub pause_ms: u64,
}

/// One turn's scheduling directives. Ephemeral: recomputed every turn, never
/// stored. The client realizes the delays; nothing here blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingDecision {
    pub typing_duration_ms: u64,
    pub read_delay_ms: u64,
    pub char_pace_ms_per_char: u64,
    pub pause_marks: Vec<PauseMark>,
    pub mode: EmotionalMode,
    /// Withhold the reply entirely (confession met with low warmth).
    pub withhold: bool,
    /// Fake typing, then silence, then `post_abort_wait_ms` before anything
    /// else happens.
    pub abort: bool,
    pub post_abort_wait_ms: u64,
}

impl PacingDecision {
    pub fn pace_level(&self) -> PaceLevel {
        if self.char_pace_ms_per_char >= 120 {
            PaceLevel::Slow
        } else if self.char_pace_ms_per_char <= 50 {
            PaceLevel::Fast
        } else {
            PaceLevel::Normal
        }
    }
}

pub fn emotional_mode(state: &ConversationState, flags: &EventFlags) -> EmotionalMode {
    if state.tension > 7 {
        EmotionalMode::Tense
    } else if flags.confession || flags.retraction_seen || state.under_retraction_influence() {
        EmotionalMode::Serious
    } else if flags.romantic {
        EmotionalMode::Hesitant
    } else if state.warmth <= -3 {
        EmotionalMode::Cold
    } else {
        EmotionalMode::Normal
    }
}

fn base_typing_ms(warmth: i32, rng: &mut StdRng) -> u64 {
    match warmth {
        i32::MIN..=-2 => rng.random_range(8_000..=15_000),
        -1..=1 => rng.random_range(4_000..=8_000),
        2..=3 => rng.random_range(2_000..=4_000),
        _ => rng.random_range(1_000..=2_000),
    }
}

fn read_delay_ms(warmth: i32, rng: &mut StdRng) -> u64 {
    if warmth > 3 {
        rng.random_range(5_000..=30_000)
    } else if warmth >= 0 {
        rng.random_range(60_000..=300_000)
    } else {
        rng.random_range(600_000..=1_800_000)
    }
}

fn char_pace_ms(mode: EmotionalMode, rng: &mut StdRng) -> u64 {
    match mode {
        EmotionalMode::Cold => rng.random_range(30..=50), // quick dismissal
        EmotionalMode::Normal => rng.random_range(60..=90),
        EmotionalMode::Serious => rng.random_range(150..=200),
        EmotionalMode::Hesitant => rng.random_range(100..=150),
        EmotionalMode::Tense => rng.random_range(50..=200),
    }
}

/// Punctuation-triggered pauses, recorded as char offsets into the response
/// text. An ASCII ellipsis ("...") counts once, at its last dot.
fn pause_marks(text: &str, rng: &mut StdRng) -> Vec<PauseMark> {
    let chars: Vec<char> = text.chars().collect();
    let mut marks = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '…' => {
                marks.push(PauseMark {
                    char_offset: i,
                    pause_ms: rng.random_range(500..=1_000),
                });
            }
            '.' | '。' => {
                let mut run = 1;
                while chars[i] == '.' && i + run < chars.len() && chars[i + run] == '.' {
                    run += 1;
                }
                if run >= 3 {
                    marks.push(PauseMark {
                        char_offset: i + run - 1,
                        pause_ms: rng.random_range(500..=1_000),
                    });
                    i += run;
                    continue;
                }
                marks.push(PauseMark {
                    char_offset: i,
                    pause_ms: rng.random_range(200..=500),
                });
            }
            '?' | '？' => {
                marks.push(PauseMark {
                    char_offset: i,
                    pause_ms: 300,
                });
            }
            _ => {}
        }
        i += 1;
    }
    marks
}

/// Deterministic in `(state, flags, response_text, seed)`. The seed comes
/// from the conversation's turn counter, so a replayed turn paces
/// identically. Note the typing duration is indicator display time: a short
/// message still honors a long duration.
pub fn decide(
    state: &ConversationState,
    flags: &EventFlags,
    response_text: &str,
    seed: u64,
) -> PacingDecision {
    let mut rng = StdRng::seed_from_u64(seed);

    let mode = emotional_mode(state, flags);
    let mut typing = base_typing_ms(state.warmth, &mut rng) as i64;
    let mut withhold = false;

    if flags.romantic {
        typing += rng.random_range(5_000..=10_000);
    }
    if flags.question {
        typing += rng.random_range(2_000..=3_000);
    }
    if flags.retraction_seen {
        typing += rng.random_range(10_000..=20_000);
    }
    if flags.confession {
        // Explicit branch on the post-mutation warmth: warm enough means a
        // long, deliberate reply; otherwise she goes quiet.
        if state.warmth >= 2 {
            typing += rng.random_range(15_000..=30_000);
        } else {
            withhold = true;
        }
    }

    let mut abort = false;
    let mut post_abort_wait_ms = 0;
    if state.tension > 7 {
        // High tension reads as erratic: an independent perturbation on top
        // of base + modifiers, floored at zero below.
        typing += rng.random_range(-10_000..=10_000);
        if rng.random_range(0..10) < 2 {
            abort = true;
            post_abort_wait_ms = rng.random_range(5_000..=15_000);
        }
    }

    let read_delay = read_delay_ms(state.warmth, &mut rng);
    let char_pace = char_pace_ms(mode, &mut rng);
    let marks = pause_marks(response_text, &mut rng);

    PacingDecision {
        typing_duration_ms: typing.max(0) as u64,
        read_delay_ms: read_delay,
        char_pace_ms_per_char: char_pace,
        pause_marks: marks,
        mode,
        withhold,
        abort,
        post_abort_wait_ms,
    }
}
