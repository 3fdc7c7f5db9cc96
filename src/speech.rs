use crate::error::{PipelineError, PipelineResult};
use crate::model::Voice;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// One synthesis call: the chosen voice, the (already truncated) text and
/// the delivery instructions.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub voice: Voice,
    pub text: String,
    pub instructions: String,
    pub speed: f32,
}

/// Boundary to the speech-synthesis service. The reply is a binary audio
/// stream written to the caller-supplied path.
#[async_trait]
pub trait SpeechClient: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> PipelineResult<()>;
}

/// Client for an OpenAI-compatible `/audio/speech` endpoint, requesting WAV
/// output so the assembler can splice clips without re-encoding.
pub struct OpenAiSpeechClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiSpeechClient {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(serde::Serialize)]
struct SpeechRequestBody<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    instructions: &'a str,
    speed: f32,
    response_format: &'a str,
}

#[async_trait]
impl SpeechClient for OpenAiSpeechClient {
    async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> PipelineResult<()> {
        let url = format!("{}/audio/speech", self.base_url);
        let body = SpeechRequestBody {
            model: &self.model,
            voice: request.voice.id(),
            input: &request.text,
            instructions: &request.instructions,
            speed: request.speed,
            response_format: "wav",
        };

        let mut resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(PipelineError::RemoteService(format!(
                "speech endpoint returned {status}: {detail}"
            )));
        }

        let mut file = tokio::fs::File::create(output).await?;
        while let Some(chunk) = resp.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(())
    }
}
