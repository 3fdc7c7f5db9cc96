use crate::error::{PipelineError, PipelineResult};
use crate::llm::LlmClient;
use crate::model::{ContentAnalysis, Persona, PodcastConfig, PodcastSegment};
use crate::repair::repair_json;
use log::{info, warn};
use serde::Deserialize;
use std::sync::Arc;

/// Target number of speaker turns for a given program length. Monotonic:
/// longer programs never get fewer segments.
pub fn target_segment_count(duration_minutes: u32) -> usize {
    if duration_minutes <= 1 {
        4
    } else if duration_minutes <= 2 {
        6
    } else {
        (duration_minutes as usize * 3).max(6)
    }
}

/// Detects and repairs language drift in generated dialogue. The underlying
/// requirement is locale-agnostic, so the word lists live behind this seam
/// rather than in the generator itself.
pub trait LocaleChecker: Send + Sync {
    fn locale(&self) -> &str;
    /// True when the text reads as the target locale.
    fn is_consistent(&self, text: &str) -> bool;
    /// Best-effort rewrite toward the target locale. Must never drop text.
    fn correct(&self, text: &str) -> String;
}

/// Brazilian-Portuguese checker: counts common English function words and
/// substitutes a short list of frequent English phrases.
pub struct BrazilianPortuguese;

const ENGLISH_MARKERS: &[&str] = &[
    "the", "and", "that", "with", "for", "this", "you", "are", "have", "was", "were", "been",
    "will", "would",
];

// Up to two hits are tolerated; technical loanwords are common in pt-BR.
const MARKER_TOLERANCE: usize = 2;

const CORRECTIONS: &[(&str, &str)] = &[
    ("thank you", "obrigado"),
    ("thanks", "obrigado"),
    ("hello", "olá"),
    ("welcome", "bem-vindos"),
    ("today", "hoje"),
    ("let's", "vamos"),
    ("great", "ótimo"),
    ("hi", "oi"),
];

impl LocaleChecker for BrazilianPortuguese {
    fn locale(&self) -> &str {
        "pt-BR"
    }

    fn is_consistent(&self, text: &str) -> bool {
        let padded = format!(" {} ", text.to_lowercase());
        let hits = ENGLISH_MARKERS
            .iter()
            .filter(|word| padded.contains(&format!(" {word} ")))
            .count();
        hits <= MARKER_TOLERANCE
    }

    fn correct(&self, text: &str) -> String {
        let mut corrected = text.to_string();
        for (english, portuguese) in CORRECTIONS {
            corrected = corrected.replace(english, portuguese);
        }
        corrected
    }
}

/// Third pipeline stage: one request produces the entire turn-by-turn
/// script. The returned order is final; nothing downstream reorders it.
pub struct ScriptGenerator {
    llm: Arc<dyn LlmClient>,
    checker: Box<dyn LocaleChecker>,
}

const SYSTEM_PROMPT: &str = "Você é um roteirista especializado em podcasts brasileiros. Crie \
conversas naturais e envolventes SEMPRE em português brasileiro. Mantenha consistência de \
idioma do início ao fim. Responda apenas com JSON válido.";

#[derive(Deserialize)]
struct ScriptPayload {
    segments: Vec<SegmentPayload>,
}

#[derive(Deserialize)]
struct SegmentPayload {
    speaker: String,
    text: String,
}

impl ScriptGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, checker: Box<dyn LocaleChecker>) -> Self {
        Self { llm, checker }
    }

    /// Never fails: a reply that cannot be parsed into at least one segment
    /// degrades to the documented 4-segment default script.
    pub async fn generate(
        &self,
        analysis: &ContentAnalysis,
        persona1: &Persona,
        persona2: &Persona,
        config: &PodcastConfig,
    ) -> Vec<PodcastSegment> {
        match self.request_script(analysis, persona1, persona2, config).await {
            Ok(segments) => {
                info!("script ready with {} segments", segments.len());
                segments
            }
            Err(err) => {
                warn!("script generation failed, using default script: {err}");
                default_script(persona1, persona2, config)
            }
        }
    }

    async fn request_script(
        &self,
        analysis: &ContentAnalysis,
        persona1: &Persona,
        persona2: &Persona,
        config: &PodcastConfig,
    ) -> PipelineResult<Vec<PodcastSegment>> {
        let target = target_segment_count(config.duration_minutes);
        let prompt = build_prompt(analysis, persona1, persona2, config, target);
        let reply = self.llm.chat(SYSTEM_PROMPT, &prompt).await?;
        let candidate = repair_json(&reply)?;
        let payload: ScriptPayload = serde_json::from_str(&candidate)?;

        if payload.segments.is_empty() {
            return Err(PipelineError::MalformedResponse(
                "script reply contained zero segments".to_string(),
            ));
        }

        // The checker may rewrite text but never drops or reorders a turn.
        let segments = payload
            .segments
            .into_iter()
            .map(|segment| {
                let text = if self.checker.is_consistent(&segment.text) {
                    segment.text
                } else {
                    let head: String = segment.text.chars().take(50).collect();
                    warn!(
                        "segment drifted from {}, rewriting: {head}...",
                        self.checker.locale()
                    );
                    self.checker.correct(&segment.text)
                };
                PodcastSegment::new(segment.speaker, text)
            })
            .collect();

        Ok(segments)
    }
}

fn build_prompt(
    analysis: &ContentAnalysis,
    persona1: &Persona,
    persona2: &Persona,
    config: &PodcastConfig,
    target: usize,
) -> String {
    let key_points = serde_json::to_string_pretty(&analysis.key_points)
        .unwrap_or_else(|_| "[]".to_string());
    format!(
        "Crie um roteiro COMPLETO em PORTUGUÊS BRASILEIRO para um podcast de {duration} \
         minutos.\n\n\
         CONFIGURAÇÃO:\n\
         - Título: {title}\n\
         - Tópico: {topic}\n\
         - Tom: {tone}\n\
         - Formato: {format}\n\
         - Público: {audience}\n\
         - Duração alvo: {duration} minutos (~{target} segmentos)\n\n\
         APRESENTADORES BRASILEIROS:\n\
         - {name1} ({role1}): {personality1}\n\
         - {name2} ({role2}): {personality2}\n\n\
         PONTOS PRINCIPAIS A COBRIR:\n{key_points}\n\n\
         INSTRUÇÕES CRÍTICAS:\n\
         1. TODO O DIÁLOGO deve ser em PORTUGUÊS BRASILEIRO natural\n\
         2. Use expressões, gírias e jeito brasileiro de falar\n\
         3. Evite termos muito técnicos em inglês\n\
         4. Mantenha consistência de idioma do início ao fim\n\
         5. {name1} deve falar de forma {style1}\n\
         6. {name2} deve falar de forma {style2}\n\n\
         ESTRUTURA PARA {duration} MINUTOS:\n\
         - Abertura rápida (10-15% do tempo)\n\
         - Desenvolvimento dos pontos principais (70-80% do tempo)\n\
         - Encerramento (5-10% do tempo)\n\n\
         Crie exatamente {target} segmentos alternando entre os apresentadores.\n\
         Cada segmento deve ter 1-3 frases para caber no tempo.\n\n\
         FORMATO DE SAÍDA (JSON):\n\
         {{\"segments\": [{{\"speaker\": \"{name1}\", \"text\": \"...\"}}, \
         {{\"speaker\": \"{name2}\", \"text\": \"...\"}}]}}\n\n\
         RESPONDA APENAS COM JSON VÁLIDO EM PORTUGUÊS BRASILEIRO.",
        duration = config.duration_minutes,
        title = config.title,
        topic = analysis.topic,
        tone = config.tone.as_str(),
        format = config.format_style,
        audience = analysis.target_audience,
        target = target,
        name1 = persona1.name,
        role1 = persona1.role,
        personality1 = persona1.personality,
        style1 = persona1.speaking_style,
        name2 = persona2.name,
        role2 = persona2.role,
        personality2 = persona2.personality,
        style2 = persona2.speaking_style,
        key_points = key_points,
    )
}

/// Documented default script used when the service reply is unusable.
pub fn default_script(
    persona1: &Persona,
    persona2: &Persona,
    config: &PodcastConfig,
) -> Vec<PodcastSegment> {
    vec![
        PodcastSegment::new(
            &persona1.name,
            format!(
                "Olá pessoal, bem-vindos ao nosso podcast! Eu sou {}.",
                persona1.name
            ),
        ),
        PodcastSegment::new(
            &persona2.name,
            format!(
                "E eu sou {}! Hoje vamos falar sobre {}.",
                persona2.name, config.topic
            ),
        ),
        PodcastSegment::new(
            &persona1.name,
            "Vamos começar explorando os aspectos principais deste tema.",
        ),
        PodcastSegment::new(
            &persona2.name,
            "Excelente! Obrigado por nos acompanhar até aqui.",
        ),
    ]
}
