use async_openai::{Client, config::OpenAIConfig};
use invisible_wall::error::SpeechError;
use invisible_wall::speech::{SpeechConfig, synthesize_and_play};

const USAGE: &str = "speak [options] <text...>

Options:
    --model  <name>    tts model (default: tts-1)
    --voice  <name>    alloy|echo|fable|onyx|nova|shimmer (default: onyx)
    --speed  <f>       0.25..=4.0 (default: 1.0)
    --format <name>    mp3|opus|aac|flac|wav|pcm (default: mp3)

Requires OPENAI_API_KEY in the environment.";

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut model = "tts-1".to_string();
    let mut voice = "onyx".to_string();
    let mut speed = 1.0f32;
    let mut format = "mp3".to_string();
    let mut text_parts: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let take_value = |i: usize| -> Option<String> { args.get(i + 1).cloned() };
        match args[i].as_str() {
            "--model" => match take_value(i) {
                Some(value) => {
                    model = value;
                    i += 2;
                }
                None => usage_error("--model needs a value"),
            },
            "--voice" => match take_value(i) {
                Some(value) => {
                    voice = value;
                    i += 2;
                }
                None => usage_error("--voice needs a value"),
            },
            "--speed" => match take_value(i).and_then(|v| v.parse().ok()) {
                Some(value) => {
                    speed = value;
                    i += 2;
                }
                None => usage_error("--speed needs a number"),
            },
            "--format" => match take_value(i) {
                Some(value) => {
                    format = value;
                    i += 2;
                }
                None => usage_error("--format needs a value"),
            },
            _ => {
                text_parts.push(args[i].clone());
                i += 1;
            }
        }
    }

    let text = text_parts.join(" ");
    if text.trim().is_empty() {
        usage_error("no text to speak");
    }

    let config = match SpeechConfig::new(&model, &voice, speed, &format) {
        Ok(config) => config,
        Err(e) => usage_error(&e.to_string()),
    };

    let client = Client::with_config(
        OpenAIConfig::new().with_api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default()),
    );

    if let Err(e) = synthesize_and_play(&client, &text, &config).await {
        match e {
            SpeechError::NoPlayer => eprintln!("Error: no audio player found on this host"),
            other => eprintln!("Error: {other}"),
        }
        std::process::exit(1);
    }
}

fn usage_error(message: &str) -> ! {
    eprintln!("Error: {message}\n\n{USAGE}");
    std::process::exit(2);
}
