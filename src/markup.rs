use crate::display::{DisplayState, PresenceStatus};
use crate::pacing::{PaceLevel, PacingDecision};
use crate::state::ConversationState;
use std::fmt;
use std::str::FromStr;

/// One inline control token, serialized as `<!--key:field=value,...-->`.
/// These are the only state-derived bits that ever cross to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Presence {
        status: PresenceStatus,
        last_active: String,
    },
    Read {
        delay_ms: u64,
    },
    Typing {
        duration_ms: u64,
        abort: bool,
    },
    Pause {
        ms: u64,
    },
    Pace {
        level: PaceLevel,
    },
    /// Debug/telemetry only, gated by settings; never emitted in normal play.
    State {
        fields: Vec<(String, i32)>,
    },
    Retraction {
        seen: bool,
        acknowledged: bool,
        tension_delta: i32,
    },
    Wait {
        ms: u64,
    },
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Presence {
                status,
                last_active,
            } => write!(
                f,
                "<!--presence:status={},last_active={}-->",
                status, last_active
            ),
            Annotation::Read { delay_ms } => write!(f, "<!--read:delay={}-->", delay_ms),
            Annotation::Typing { duration_ms, abort } => {
                if *abort {
                    write!(f, "<!--typing:duration={},abort=true-->", duration_ms)
                } else {
                    write!(f, "<!--typing:duration={}-->", duration_ms)
                }
            }
            Annotation::Pause { ms } => write!(f, "<!--pause:{}-->", ms),
            Annotation::Pace { level } => write!(f, "<!--pace:{}-->", level),
            Annotation::State { fields } => {
                let joined = fields
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, value))
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "<!--state:{}-->", joined)
            }
            Annotation::Retraction {
                seen,
                acknowledged,
                tension_delta,
            } => write!(
                f,
                "<!--retraction:seen={},acknowledged={},tension_delta={:+}-->",
                seen, acknowledged, tension_delta
            ),
            Annotation::Wait { ms } => write!(f, "<!--wait:{}-->", ms),
        }
    }
}

/// Serialize a turn's decisions into the outgoing text stream. Document
/// order matters: presence first, then read (the receipt always precedes
/// typing-start), then typing, then the paced body.
pub fn annotate(
    text: &str,
    decision: &PacingDecision,
    display: &DisplayState,
    retraction_ack: Option<(bool, i32)>,
    debug_state: Option<&ConversationState>,
) -> (String, Vec<Annotation>) {
    let mut annotations: Vec<Annotation> = Vec::new();

    annotations.push(Annotation::Presence {
        status: display.presence,
        last_active: display.last_active_token.clone(),
    });
    annotations.push(Annotation::Read {
        delay_ms: decision.read_delay_ms,
    });

    if decision.withhold {
        // Silence: the read receipt is the whole reply.
    } else {
        annotations.push(Annotation::Typing {
            duration_ms: decision.typing_duration_ms,
            abort: decision.abort,
        });
        if decision.abort {
            annotations.push(Annotation::Wait {
                ms: decision.post_abort_wait_ms,
            });
        }
        annotations.push(Annotation::Pace {
            level: decision.pace_level(),
        });
    }

    let mut out = String::new();
    for annotation in &annotations {
        out.push_str(&annotation.to_string());
    }

    if !decision.withhold {
        let mut marks = decision.pause_marks.iter().peekable();
        for (offset, ch) in text.chars().enumerate() {
            out.push(ch);
            while let Some(mark) = marks.peek() {
                if mark.char_offset == offset {
                    let pause = Annotation::Pause { ms: mark.pause_ms };
                    out.push_str(&pause.to_string());
                    annotations.push(pause);
                    marks.next();
                } else {
                    break;
                }
            }
        }
    }

    if let Some((acknowledged, tension_delta)) = retraction_ack {
        let ack = Annotation::Retraction {
            seen: true,
            acknowledged,
            tension_delta,
        };
        out.push_str(&ack.to_string());
        annotations.push(ack);
    }

    if let Some(state) = debug_state {
        let debug = Annotation::State {
            fields: vec![
                ("warmth".to_string(), state.warmth),
                ("tension".to_string(), state.tension),
                ("trust".to_string(), state.trust),
                ("disappointment".to_string(), state.disappointment),
                ("need".to_string(), state.need),
                ("rhythm".to_string(), state.rhythm),
            ],
        };
        out.push_str(&debug.to_string());
        annotations.push(debug);
    }

    (out, annotations)
}

/// A recognized annotation and the char offset in the cleaned text where it
/// sat. The client applies each exactly once, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub offset: usize,
    pub annotation: Annotation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub text: String,
    pub directives: Vec<Directive>,
}

/// Client-side parse: strip every annotation form before rendering. Malformed
/// or unrecognized tokens are stripped and logged, never rendered literally
/// and never fatal.
pub fn parse(raw: &str) -> ParsedResponse {
    let mut text = String::new();
    let mut directives = Vec::new();
    let mut rest = raw;

    while let Some(start) = rest.find("<!--") {
        let (before, tail) = rest.split_at(start);
        text.push_str(before);
        match tail.find("-->") {
            Some(end) => {
                let inner = &tail[4..end];
                let offset = text.chars().count();
                match parse_annotation(inner) {
                    Some(annotation) => directives.push(Directive { offset, annotation }),
                    None => log::warn!("stripping unrecognized annotation: <!--{}-->", inner),
                }
                rest = &tail[end + 3..];
            }
            None => {
                // Unterminated token: strip to the end of the stream.
                log::warn!("stripping unterminated annotation: {}", tail);
                rest = "";
            }
        }
    }
    text.push_str(rest);

    ParsedResponse { text, directives }
}

fn parse_fields(params: &str) -> Vec<(&str, &str)> {
    params
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

fn field<'a>(fields: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| *value)
}

fn parse_annotation(inner: &str) -> Option<Annotation> {
    let (key, params) = inner.split_once(':')?;
    match key {
        "presence" => {
            let fields = parse_fields(params);
            let status = PresenceStatus::from_str(field(&fields, "status")?).ok()?;
            let last_active = field(&fields, "last_active").unwrap_or("now").to_string();
            Some(Annotation::Presence {
                status,
                last_active,
            })
        }
        "read" => {
            let fields = parse_fields(params);
            let delay_ms = field(&fields, "delay")?.parse().ok()?;
            Some(Annotation::Read { delay_ms })
        }
        "typing" => {
            let fields = parse_fields(params);
            let duration_ms = field(&fields, "duration")?.parse().ok()?;
            let abort = field(&fields, "abort") == Some("true");
            Some(Annotation::Typing { duration_ms, abort })
        }
        "pause" => params.parse().ok().map(|ms| Annotation::Pause { ms }),
        "pace" => PaceLevel::from_str(params)
            .ok()
            .map(|level| Annotation::Pace { level }),
        "state" => {
            let fields: Vec<(String, i32)> = parse_fields(params)
                .into_iter()
                .filter_map(|(name, value)| Some((name.to_string(), value.parse().ok()?)))
                .collect();
            if fields.is_empty() {
                return None;
            }
            Some(Annotation::State { fields })
        }
        "retraction" => {
            let fields = parse_fields(params);
            let seen = field(&fields, "seen")?.parse().ok()?;
            let acknowledged = field(&fields, "acknowledged")?.parse().ok()?;
            let raw_delta = field(&fields, "tension_delta")?;
            let tension_delta = raw_delta.trim_start_matches('+').parse().ok()?;
            Some(Annotation::Retraction {
                seen,
                acknowledged,
                tension_delta,
            })
        }
        "wait" => params.parse().ok().map(|ms| Annotation::Wait { ms }),
        _ => None,
    }
}
