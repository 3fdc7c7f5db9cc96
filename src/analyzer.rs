use crate::error::PipelineResult;
use crate::llm::LlmClient;
use crate::model::ContentAnalysis;
use crate::repair::repair_json;
use log::{info, warn};
use std::sync::Arc;

/// First pipeline stage: turns raw text into a [`ContentAnalysis`].
pub struct ContentAnalyzer {
    llm: Arc<dyn LlmClient>,
}

const SYSTEM_PROMPT: &str = "Você é um especialista em análise de conteúdo e produção de \
podcasts. Analise o conteúdo fornecido e retorne apenas JSON válido.";

impl ContentAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Never fails: any service or parse error degrades to
    /// [`ContentAnalysis::fallback`], logged at warn level.
    pub async fn analyze(&self, content: &str) -> ContentAnalysis {
        match self.request_analysis(content).await {
            Ok(analysis) => {
                info!("content analysis complete: topic '{}'", analysis.topic);
                analysis
            }
            Err(err) => {
                warn!("content analysis failed, using fallback analysis: {err}");
                ContentAnalysis::fallback()
            }
        }
    }

    async fn request_analysis(&self, content: &str) -> PipelineResult<ContentAnalysis> {
        let prompt = build_prompt(content);
        let reply = self.llm.chat(SYSTEM_PROMPT, &prompt).await?;
        let candidate = repair_json(&reply)?;
        let analysis: ContentAnalysis = serde_json::from_str(&candidate)?;
        Ok(analysis.clamped())
    }
}

fn build_prompt(content: &str) -> String {
    format!(
        "Analise o seguinte conteúdo e forneça uma estrutura detalhada para um podcast EM \
         PORTUGUÊS BRASILEIRO:\n\n\
         CONTEÚDO:\n{content}\n\n\
         IMPORTANTE: Todo o conteúdo deve ser em PORTUGUÊS BRASILEIRO.\n\n\
         Forneça uma análise em JSON com:\n\
         1. topic: tópico principal (em português)\n\
         2. key_points: 5-8 pontos principais (em português)\n\
         3. target_audience: público-alvo (em português)\n\
         4. recommended_tone: tom recomendado (casual, professional, educational, entertaining, \
         technical ou storytelling)\n\
         5. complexity_level: nível de complexidade (1-5)\n\
         6. estimated_duration: duração estimada em minutos\n\
         7. discussion_angles: diferentes ângulos para discutir o tema (em português)\n\
         8. questions_to_explore: perguntas interessantes para explorar (em português)\n\
         9. examples_and_stories: exemplos e histórias relevantes (em português)\n\
         10. actionable_insights: insights práticos para o público (em português)\n\n\
         Responda APENAS com JSON válido em português brasileiro."
    )
}
