use crate::state::ConversationState;
use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Online indicator shown in the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    OnlineTyping,
    OnlineIdle,
    Away,
    Offline,
}

/// Temperature icon in the status bar. Mapped from *lagged* warmth, so the
/// observer always sees where things stood a couple of turns ago.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TemperatureIcon {
    Freezing,
    Chilly,
    Mild,
    Warm,
    Hesitant,
    Distant,
}

impl TemperatureIcon {
    pub fn glyph(&self) -> &'static str {
        match self {
            TemperatureIcon::Freezing => "❄",
            TemperatureIcon::Chilly => "☁",
            TemperatureIcon::Mild => "🌤",
            TemperatureIcon::Warm => "☀",
            TemperatureIcon::Hesitant => "💭",
            TemperatureIcon::Distant => "📉",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TemperatureIcon::Freezing => "冷",
            TemperatureIcon::Chilly => "微凉",
            TemperatureIcon::Mild => "还行",
            TemperatureIcon::Warm => "暖",
            TemperatureIcon::Hesitant => "迟疑",
            TemperatureIcon::Distant => "疏远中",
        }
    }
}

/// What the user is allowed to see. Strictly separate from
/// `ConversationState`: there is no conversion between the two, only this
/// projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayState {
    pub presence: PresenceStatus,
    /// `None` means the icon is deliberately omitted (lagged warmth 4..=5),
    /// denying the observer a confirming signal at the top of the range.
    pub temperature: Option<TemperatureIcon>,
    pub last_active_label: String,
    /// ASCII form of the same bucket, carried in the presence annotation.
    pub last_active_token: String,
}

fn temperature_icon(state: &ConversationState) -> Option<TemperatureIcon> {
    // Live overrides first: hesitation and distancing show through
    // immediately even while warmth stays lagged.
    if state.tension > 7 {
        return Some(TemperatureIcon::Hesitant);
    }
    if state.disappointment > 5 {
        return Some(TemperatureIcon::Distant);
    }

    match state.lagged_warmth() {
        i32::MIN..=-3 => Some(TemperatureIcon::Freezing),
        -2..=-1 => Some(TemperatureIcon::Chilly),
        0..=1 => Some(TemperatureIcon::Mild),
        2..=3 => Some(TemperatureIcon::Warm),
        _ => None, // 4..=5: hidden at maximum warmth
    }
}

/// Bucket elapsed time since last outgoing activity into fixed labels.
pub fn last_active_label(elapsed_minutes: i64) -> &'static str {
    match elapsed_minutes {
        i64::MIN..=0 => "刚刚",
        1..=4 => "5分钟内",
        5..=29 => "半小时内",
        30..=59 => "1小时内",
        60..=179 => "3小时内",
        180..=719 => "今天",
        _ => "很久以前",
    }
}

/// Same buckets, as the ASCII token the annotation stream carries.
pub fn last_active_token(elapsed_minutes: i64) -> &'static str {
    match elapsed_minutes {
        i64::MIN..=0 => "now",
        1..=4 => "5m",
        5..=29 => "30m",
        30..=59 => "1h",
        60..=179 => "3h",
        180..=719 => "12h",
        _ => "12h+",
    }
}

const NIGHT_START_HOUR: u32 = 1;
const NIGHT_END_HOUR: u32 = 5;

fn presence(state: &ConversationState, now: DateTime<Local>, typing_active: bool) -> PresenceStatus {
    if typing_active {
        return PresenceStatus::OnlineTyping;
    }

    let idle_minutes = state
        .last_active_at
        .map(|last| now.signed_duration_since(last).num_minutes())
        .unwrap_or(0);

    let hour = now.hour();
    if (NIGHT_START_HOUR..NIGHT_END_HOUR).contains(&hour) {
        if idle_minutes >= 30 {
            return PresenceStatus::Offline;
        }
        if idle_minutes >= 5 {
            return PresenceStatus::Away;
        }
    }

    // Read without a reply for over five minutes shows as idle presence.
    if let Some(read_at) = state.last_read_at {
        let replied_since = state
            .last_active_at
            .map(|active| active >= read_at)
            .unwrap_or(false);
        if !replied_since && now.signed_duration_since(read_at).num_minutes() > 5 {
            return PresenceStatus::OnlineIdle;
        }
    }

    PresenceStatus::Online
}

/// Pure projection: same state and same `now` always yield the same output.
pub fn project(state: &ConversationState, now: DateTime<Local>, typing_active: bool) -> DisplayState {
    let elapsed_minutes = state
        .last_active_at
        .map(|last| now.signed_duration_since(last).num_minutes())
        .unwrap_or(0);

    DisplayState {
        presence: presence(state, now, typing_active),
        temperature: temperature_icon(state),
        last_active_label: last_active_label(elapsed_minutes).to_string(),
        last_active_token: last_active_token(elapsed_minutes).to_string(),
    }
}
