use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use text2podcast::config::Settings;
use text2podcast::encoder::{AudioEncoder, WavEncoder};
use text2podcast::llm::{LlmClient, OpenAiChatClient};
use text2podcast::model::PodcastConfig;
use text2podcast::pipeline::PodcastGenerator;
use text2podcast::speech::{OpenAiSpeechClient, SpeechClient};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let settings = Settings::load()?;
    settings.ensure_directories()?;

    let api_key = settings
        .llm
        .api_key
        .clone()
        .context("API key resolved at load time")?;

    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiChatClient::new(
        &api_key,
        &settings.llm.model,
        &settings.llm.base_url,
    ));
    let speech: Arc<dyn SpeechClient> = Arc::new(OpenAiSpeechClient::new(
        &api_key,
        &settings.speech.model,
        &settings.speech.base_url,
    ));
    let encoder: Arc<dyn AudioEncoder> = Arc::new(WavEncoder);

    let generator = PodcastGenerator::new(&settings, llm, speech, encoder);

    let mut inputs: Vec<PathBuf> = fs::read_dir(&settings.input_folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    inputs.sort();

    if inputs.is_empty() {
        println!(
            "No .txt files in '{}'. Drop source texts there and run again.",
            settings.input_folder
        );
        return Ok(());
    }

    for path in inputs {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {path:?}"))?;
        let config = podcast_config_for(&path, &content, &settings);

        println!("Generating podcast: {}", config.title);
        let artifact = generator.generate(&content, &config).await?;
        println!("  -> {}", artifact.display());
    }

    Ok(())
}

fn podcast_config_for(path: &std::path::Path, content: &str, settings: &Settings) -> PodcastConfig {
    let title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().replace('_', " "))
        .unwrap_or_else(|| "Podcast".to_string());

    // Topic defaults to the opening of the source text.
    let topic: String = {
        let head: String = content.chars().take(100).collect();
        if content.chars().count() > 100 {
            format!("{head}...")
        } else {
            head
        }
    };

    PodcastConfig::new(
        title,
        topic,
        settings.podcast.duration_minutes,
        settings.podcast.tone,
        settings.podcast.target_audience.clone(),
        settings.podcast.format_style.clone(),
    )
}
