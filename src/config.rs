use crate::model::Tone;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Process-level settings loaded from `config.yml`. Everything has a
/// default; the only hard requirement is an API key, either in the file or
/// in the `OPENAI_API_KEY` environment variable.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_input")]
    pub input_folder: String,

    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default = "default_build")]
    pub build_folder: String,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub speech: SpeechSettings,

    #[serde(default)]
    pub podcast: PodcastDefaults,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechSettings {
    #[serde(default = "default_speech_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,
    #[serde(default = "default_segment_timeout")]
    pub segment_timeout_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_silence_ms")]
    pub silence_ms: u32,
}

/// Defaults for the per-run [`crate::model::PodcastConfig`] fields the CLI
/// does not derive from the input file itself.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PodcastDefaults {
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default = "default_audience")]
    pub target_audience: String,
    #[serde(default = "default_format_style")]
    pub format_style: String,
}

fn default_input() -> String {
    "input".to_string()
}
fn default_output() -> String {
    "output".to_string()
}
fn default_build() -> String {
    "build".to_string()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_speech_model() -> String {
    "gpt-4o-mini-tts".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_speed() -> f32 {
    1.0
}
fn default_max_input_chars() -> usize {
    4000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    2
}
fn default_segment_timeout() -> u64 {
    120
}
fn default_max_concurrency() -> usize {
    3
}
fn default_silence_ms() -> u32 {
    800
}
fn default_duration_minutes() -> u32 {
    2
}
fn default_audience() -> String {
    "Público geral".to_string()
}
fn default_format_style() -> String {
    "Conversa informal entre dois apresentadores".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_chat_model(),
            base_url: default_base_url(),
        }
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            model: default_speech_model(),
            base_url: default_base_url(),
            speed: default_speed(),
            max_input_chars: default_max_input_chars(),
            max_attempts: default_max_attempts(),
            initial_backoff_secs: default_initial_backoff(),
            segment_timeout_secs: default_segment_timeout(),
            max_concurrency: default_max_concurrency(),
            silence_ms: default_silence_ms(),
        }
    }
}

impl Default for PodcastDefaults {
    fn default() -> Self {
        Self {
            duration_minutes: default_duration_minutes(),
            tone: Tone::default(),
            target_audience: default_audience(),
            format_style: default_format_style(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_folder: default_input(),
            output_folder: default_output(),
            build_folder: default_build(),
            llm: LlmSettings::default(),
            speech: SpeechSettings::default(),
            podcast: PodcastDefaults::default(),
        }
    }
}

impl Settings {
    /// Loads `config.yml` if present, otherwise starts from defaults, then
    /// resolves the API key. A missing key is the one startup condition
    /// that aborts the run.
    pub fn load() -> Result<Self> {
        let path = Path::new("config.yml");
        let mut settings = if path.exists() {
            let content = fs::read_to_string(path).context("Failed to read config.yml")?;
            serde_yaml_ng::from_str(&content).context("Failed to parse config.yml")?
        } else {
            Settings::default()
        };

        if settings.llm.api_key.as_deref().map_or(true, str::is_empty) {
            settings.llm.api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        }
        if settings.llm.api_key.is_none() {
            anyhow::bail!(
                "API key missing: set llm.api_key in config.yml or the OPENAI_API_KEY environment variable"
            );
        }

        Ok(settings)
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.input_folder)?;
        fs::create_dir_all(&self.output_folder)?;
        fs::create_dir_all(&self.build_folder)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_fills_defaults() {
        let settings: Settings = serde_yaml_ng::from_str("llm:\n  api_key: test-key\n").unwrap();
        assert_eq!(settings.input_folder, "input");
        assert_eq!(settings.speech.max_attempts, 3);
        assert_eq!(settings.speech.initial_backoff_secs, 2);
        assert_eq!(settings.speech.segment_timeout_secs, 120);
        assert_eq!(settings.speech.max_concurrency, 3);
        assert_eq!(settings.speech.silence_ms, 800);
        assert_eq!(settings.podcast.tone, Tone::Casual);
    }

    #[test]
    fn speech_section_overrides() {
        let yaml = "speech:\n  max_attempts: 5\n  silence_ms: 250\n";
        let settings: Settings = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(settings.speech.max_attempts, 5);
        assert_eq!(settings.speech.silence_ms, 250);
        assert_eq!(settings.speech.model, "gpt-4o-mini-tts");
    }
}
