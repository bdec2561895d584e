use anyhow::{Context, Result, bail};
use chrono::Local;
use invisible_wall::classifier::{GameEvent, RetractionEvent, RULES};
use invisible_wall::session::{Conversation, TurnInput};
use invisible_wall::settings::EngineSettings;
use invisible_wall::state::ConversationState;

const USAGE: &str = "invisible-wall <command>

Commands:
    init  <state.json>                       create a fresh conversation state
    query <state.json>                       print the hidden state as JSON
    turn  <state.json> <text> [options]      run one turn and print the annotated reply
    rules                                    list the classifier rule table

Turn options:
    --reply <text>           the reply to pace (default: ……)
    --retract <ms> <text>    inject a retraction that was visible for <ms>";

fn main() -> Result<()> {
    let _ = invisible_wall::logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!("{USAGE}");
    };

    match command.as_str() {
        "init" => {
            let path = args.get(1).context("init needs a state file path")?;
            let state = ConversationState::new();
            state.save_to_file(path)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        "query" => {
            let path = args.get(1).context("query needs a state file path")?;
            let state = ConversationState::load_from_file(path)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        "turn" => {
            let path = args.get(1).context("turn needs a state file path")?;
            let user_text = args.get(2).context("turn needs the user's message")?;
            run_turn(path, user_text, &args[3..])?;
        }
        "rules" => {
            for rule in RULES {
                let effects = rule
                    .deltas
                    .iter()
                    .map(|(dimension, amount)| format!("{}{:+}", dimension, amount))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("{}: {}", rule.tag, effects);
            }
        }
        other => bail!("Unknown command: {other}\n\n{USAGE}"),
    }

    Ok(())
}

fn run_turn(path: &str, user_text: &str, options: &[String]) -> Result<()> {
    let mut reply = "……".to_string();
    let mut events: Vec<GameEvent> = Vec::new();
    let now = Local::now();

    let mut i = 0;
    while i < options.len() {
        match options[i].as_str() {
            "--reply" => {
                reply = options
                    .get(i + 1)
                    .context("--reply needs a value")?
                    .clone();
                i += 2;
            }
            "--retract" => {
                let visible_ms = options
                    .get(i + 1)
                    .context("--retract needs <ms> <text>")?
                    .parse()
                    .context("--retract <ms> must be a number")?;
                let preview = options
                    .get(i + 2)
                    .context("--retract needs <ms> <text>")?
                    .clone();
                events.push(GameEvent::Retraction(RetractionEvent {
                    visible_ms,
                    content_preview: Some(preview),
                    retracted_at: now,
                }));
                i += 3;
            }
            other => bail!("Unknown option: {other}\n\n{USAGE}"),
        }
    }

    let state = ConversationState::load_from_file(path)?;
    let mut conversation = Conversation::with_state(state, EngineSettings::load());

    let input = TurnInput {
        user_text: user_text.to_string(),
        events,
        now,
    };
    let output = conversation.process_turn(&input, &reply);

    println!("{}", output.response_text);
    eprintln!(
        "[{} | typing {}ms | read {}ms | {}ms/char{}]",
        output.decision.mode,
        output.decision.typing_duration_ms,
        output.decision.read_delay_ms,
        output.decision.char_pace_ms_per_char,
        if output.decision.withhold {
            " | withheld"
        } else {
            ""
        }
    );

    let state = conversation.into_state();
    let special = state.special_states();
    if !special.is_empty() {
        let names = special
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        eprintln!("[special: {names}]");
    }
    state.save_to_file(path)?;
    Ok(())
}
