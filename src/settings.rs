use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

// Define a structure to hold engine settings with serialization and
// deserialization capabilities.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EngineSettings {
    /// Depth of the warmth lag buffer; valid values are 2 and 3.
    pub lag_depth: usize,
    /// Emit the `state:` telemetry annotation. Off in normal play: hidden
    /// state must never reach the transcript.
    pub debug_state_annotations: bool,
    pub audio_output_enabled: bool, // Flag to enable or disable spoken replies.
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_speed: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            lag_depth: 3,
            debug_state_annotations: false,
            audio_output_enabled: true,
            tts_model: "tts-1".to_string(),
            tts_voice: "onyx".to_string(),
            tts_speed: 1.0,
        }
    }
}

impl EngineSettings {
    pub fn new() -> Self {
        Self::default()
    }

    // Load settings from the default file path, falling back to defaults when
    // the file is missing.
    pub fn load() -> Self {
        Self::load_from_file("./data/settings.json").unwrap_or_default()
    }

    pub fn save(&self) -> io::Result<()> {
        std::fs::create_dir_all("./data")?;
        self.save_to_file("./data/settings.json")
    }

    pub fn load_from_file(path: &str) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut settings: EngineSettings = serde_json::from_str(&data)?;
        settings.normalize();
        Ok(settings)
    }

    pub fn save_to_file(&self, path: &str) -> io::Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        if let Some(parent) = std::path::Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(data.as_bytes())?;
        Ok(())
    }

    // Out-of-range configuration is recovered, not rejected.
    pub fn normalize(&mut self) {
        self.lag_depth = self.lag_depth.clamp(2, 3);
        self.tts_speed = self.tts_speed.clamp(0.25, 4.0);
    }
}
