use crate::error::SpeechError;
use async_openai::{
    Audio, Client,
    config::OpenAIConfig,
    types::{CreateSpeechRequestArgs, SpeechModel, SpeechResponseFormat, Voice},
};
use chrono::Local;
use rodio::{Decoder, OutputStream, Sink};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// One-shot speech configuration. This subsystem is disjoint from the
/// pacing engine; none of its failures touch a conversation.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub model: SpeechModel,
    pub voice: Voice,
    pub speed: f32,
    pub format: SpeechResponseFormat,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        SpeechConfig {
            model: SpeechModel::Tts1,
            voice: Voice::Onyx,
            speed: 1.0,
            format: SpeechResponseFormat::Mp3,
        }
    }
}

impl SpeechConfig {
    pub fn new(model: &str, voice: &str, speed: f32, format: &str) -> Result<Self, SpeechError> {
        if !(0.25..=4.0).contains(&speed) {
            return Err(SpeechError::SpeedOutOfRange(speed));
        }
        Ok(SpeechConfig {
            model: parse_model(model),
            voice: parse_voice(voice)?,
            speed,
            format: parse_format(format)?,
        })
    }
}

fn parse_model(model: &str) -> SpeechModel {
    match model {
        "tts-1" => SpeechModel::Tts1,
        "tts-1-hd" => SpeechModel::Tts1Hd,
        other => SpeechModel::Other(other.to_string()),
    }
}

fn parse_voice(voice: &str) -> Result<Voice, SpeechError> {
    match voice {
        "alloy" => Ok(Voice::Alloy),
        "echo" => Ok(Voice::Echo),
        "fable" => Ok(Voice::Fable),
        "onyx" => Ok(Voice::Onyx),
        "nova" => Ok(Voice::Nova),
        "shimmer" => Ok(Voice::Shimmer),
        other => Err(SpeechError::UnknownVoice(other.to_string())),
    }
}

fn parse_format(format: &str) -> Result<SpeechResponseFormat, SpeechError> {
    match format {
        "mp3" => Ok(SpeechResponseFormat::Mp3),
        "opus" => Ok(SpeechResponseFormat::Opus),
        "aac" => Ok(SpeechResponseFormat::Aac),
        "flac" => Ok(SpeechResponseFormat::Flac),
        "wav" => Ok(SpeechResponseFormat::Wav),
        "pcm" => Ok(SpeechResponseFormat::Pcm),
        other => Err(SpeechError::UnknownFormat(other.to_string())),
    }
}

fn extension(format: &SpeechResponseFormat) -> &'static str {
    match format {
        SpeechResponseFormat::Mp3 => "mp3",
        SpeechResponseFormat::Opus => "opus",
        SpeechResponseFormat::Aac => "aac",
        SpeechResponseFormat::Flac => "flac",
        SpeechResponseFormat::Wav => "wav",
        SpeechResponseFormat::Pcm => "pcm",
        _ => "bin",
    }
}

/// A scratch audio file that is removed when dropped, so a failed save or
/// playback never leaves a partial clip behind.
pub struct TempSpeechFile {
    path: PathBuf,
}

impl TempSpeechFile {
    pub fn new(path: PathBuf) -> Self {
        TempSpeechFile { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempSpeechFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Synthesize `text` to a temp file and play it. The temp file is removed on
/// completion and on failure alike.
pub async fn synthesize_and_play(
    client: &Client<OpenAIConfig>,
    text: &str,
    config: &SpeechConfig,
) -> Result<(), SpeechError> {
    if text.trim().is_empty() {
        return Err(SpeechError::EmptyInput);
    }

    let audio = Audio::new(client);
    let response = audio
        .speech(
            CreateSpeechRequestArgs::default()
                .input(text)
                .voice(config.voice.clone())
                .model(config.model.clone())
                .speed(config.speed)
                .response_format(config.format.clone())
                .build()?,
        )
        .await?;

    let file_name = format!(
        "invisible_wall_{}.{}",
        Local::now().format("%Y%m%d_%H%M%S%f"),
        extension(&config.format)
    );
    let scratch = TempSpeechFile::new(std::env::temp_dir().join(file_name));
    response.save(scratch.path().to_string_lossy().as_ref()).await?;
    play_file(scratch.path())
}

// Blocks until playback finishes; the caller is a one-shot command, not the
// engine.
fn play_file(path: &Path) -> Result<(), SpeechError> {
    let (_stream, stream_handle) =
        OutputStream::try_default().map_err(|_| SpeechError::NoPlayer)?;
    let sink =
        Sink::try_new(&stream_handle).map_err(|e| SpeechError::Playback(e.to_string()))?;

    let file = File::open(path)?;
    let source =
        Decoder::new(BufReader::new(file)).map_err(|e| SpeechError::Playback(e.to_string()))?;

    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}
