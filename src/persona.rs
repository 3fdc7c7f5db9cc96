use crate::error::PipelineResult;
use crate::llm::LlmClient;
use crate::model::{ContentAnalysis, Persona, PodcastConfig, Tone, Voice};
use crate::repair::repair_json;
use log::{info, warn};
use serde::Deserialize;
use std::sync::Arc;

/// Common Brazilian given names, stored diacritic-folded and lowercased.
/// Lookup happens on the normalized first token of the generated name.
const MASCULINE_NAMES: &[&str] = &[
    "ricardo", "carlos", "joao", "antonio", "francisco", "paulo", "pedro", "lucas", "marcos",
    "rafael", "fernando", "bruno", "rodrigo", "daniel", "felipe", "thiago", "leonardo", "gustavo",
    "eduardo", "andre", "diego", "marcelo", "alexandre", "sergio", "mateus", "matheus", "vinicius",
    "caio", "gabriel",
];

const FEMININE_NAMES: &[&str] = &[
    "fernanda", "ana", "maria", "juliana", "carla", "patricia", "sandra", "claudia", "monica",
    "andrea", "luciana", "renata", "cristina", "paula", "amanda", "bruna", "carolina", "priscila",
    "vanessa", "camila", "jessica", "mariana", "gabriela", "isabela", "laura", "leticia",
    "beatriz", "bianca", "natalia", "raquel", "sabrina",
];

const MASCULINE_VOICES: &[Voice] = &[Voice::Echo, Voice::Onyx];
const FEMININE_VOICES: &[Voice] = &[Voice::Fable, Voice::Nova, Voice::Shimmer];

const MASCULINE_SUFFIXES: &[&str] = &["os", "ro", "do", "to", "o"];
const FEMININE_SUFFIXES: &[&str] = &["as", "na", "da", "ta", "a"];

/// FNV-1a, 64-bit. Pinned here so voice selection is identical across
/// processes and platforms; the platform hasher must not leak into this.
pub fn fnv1a64(input: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for byte in input.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

fn fold_diacritics(c: char) -> char {
    match c {
        'á' | 'â' | 'ã' | 'à' | 'ä' => 'a',
        'é' | 'ê' | 'è' => 'e',
        'í' | 'î' => 'i',
        'ó' | 'ô' | 'õ' | 'ò' => 'o',
        'ú' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        other => other,
    }
}

fn normalized_first_token(name: &str) -> String {
    name.split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_diacritics)
        .collect()
}

/// Deterministic name-to-voice mapping. Same name in, same voice out,
/// within a run and across runs. Masculine names only ever map to the
/// masculine voice subset and feminine names to the feminine one.
pub fn assign_voice(name: &str) -> Voice {
    let first = normalized_first_token(name);

    if MASCULINE_NAMES.contains(&first.as_str()) {
        let index = (fnv1a64(name) % MASCULINE_VOICES.len() as u64) as usize;
        return MASCULINE_VOICES[index];
    }
    if FEMININE_NAMES.contains(&first.as_str()) {
        let index = (fnv1a64(name) % FEMININE_VOICES.len() as u64) as usize;
        return FEMININE_VOICES[index];
    }

    // Unknown name: Portuguese endings are a decent gender signal.
    if MASCULINE_SUFFIXES.iter().any(|s| first.ends_with(s)) {
        return Voice::Echo;
    }
    if FEMININE_SUFFIXES.iter().any(|s| first.ends_with(s)) {
        return Voice::Fable;
    }

    Voice::Alloy
}

/// Second pipeline stage: derives the two complementary speaker identities.
pub struct PersonaGenerator {
    llm: Arc<dyn LlmClient>,
}

const SYSTEM_PROMPT: &str = "Você é um especialista em criação de personas para podcasts. \
Crie personas autênticas e complementares com consistência de gênero. Responda apenas com \
JSON válido.";

#[derive(Deserialize)]
struct PersonaPairPayload {
    persona1: PersonaPayload,
    persona2: PersonaPayload,
}

#[derive(Deserialize)]
struct PersonaPayload {
    name: String,
    role: String,
    personality: String,
    expertise: String,
    speaking_style: String,
    background: String,
}

impl PersonaPayload {
    fn into_persona(self, tone: Tone) -> Persona {
        let voice = assign_voice(&self.name);
        Persona {
            name: self.name,
            role: self.role,
            personality: self.personality,
            expertise: self.expertise,
            speaking_style: self.speaking_style,
            background: self.background,
            tone,
            voice,
        }
    }
}

impl PersonaGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Never fails: falls back to [`Persona::fallback_pair`] with a warning.
    pub async fn generate(
        &self,
        analysis: &ContentAnalysis,
        config: &PodcastConfig,
    ) -> (Persona, Persona) {
        match self.request_personas(analysis, config).await {
            Ok((first, second)) => {
                info!(
                    "personas ready: {} ({}) and {} ({})",
                    first.name,
                    first.voice.id(),
                    second.name,
                    second.voice.id()
                );
                (first, second)
            }
            Err(err) => {
                warn!("persona generation failed, using default pair: {err}");
                Persona::fallback_pair(config.tone)
            }
        }
    }

    async fn request_personas(
        &self,
        analysis: &ContentAnalysis,
        config: &PodcastConfig,
    ) -> PipelineResult<(Persona, Persona)> {
        let prompt = build_prompt(analysis, config);
        let reply = self.llm.chat(SYSTEM_PROMPT, &prompt).await?;
        let candidate = repair_json(&reply)?;
        let pair: PersonaPairPayload = serde_json::from_str(&candidate)?;
        Ok((
            pair.persona1.into_persona(config.tone),
            pair.persona2.into_persona(config.tone),
        ))
    }
}

fn build_prompt(analysis: &ContentAnalysis, config: &PodcastConfig) -> String {
    format!(
        "Baseado na análise de conteúdo, crie duas personas complementares para apresentar um \
         podcast EM PORTUGUÊS BRASILEIRO:\n\n\
         ANÁLISE DO CONTEÚDO:\n\
         - Tópico: {topic}\n\
         - Público-alvo: {audience}\n\
         - Tom: {tone}\n\
         - Complexidade: {complexity}/5\n\
         - Formato: {format}\n\n\
         IMPORTANTE:\n\
         - Use NOMES BRASILEIROS para as personas\n\
         - GARANTA CONSISTÊNCIA DE GÊNERO: nome masculino = persona masculina, nome feminino = \
         persona feminina\n\
         - Todo conteúdo deve ser em PORTUGUÊS BRASILEIRO\n\n\
         Crie duas personas que se complementem:\n\
         1. Uma mais especialista/técnica\n\
         2. Uma mais questionadora/representando o público\n\n\
         Para cada persona, forneça: name, role, personality, expertise, speaking_style, \
         background.\n\n\
         Responda APENAS em JSON com estrutura:\n\
         {{\"persona1\": {{\"name\": \"...\", \"role\": \"...\", \"personality\": \"...\", \
         \"expertise\": \"...\", \"speaking_style\": \"...\", \"background\": \"...\"}}, \
         \"persona2\": {{...}}}}",
        topic = analysis.topic,
        audience = analysis.target_audience,
        tone = config.tone.as_str(),
        complexity = analysis.complexity_level,
        format = config.format_style,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::model::VoiceGender;
    use async_trait::async_trait;

    #[test]
    fn assignment_is_deterministic() {
        for name in ["Ricardo Souza", "Fernanda Lima", "Zulmira", "Ana Paula"] {
            let first = assign_voice(name);
            for _ in 0..10 {
                assert_eq!(assign_voice(name), first);
            }
        }
    }

    #[test]
    fn masculine_names_never_get_feminine_voices() {
        for name in MASCULINE_NAMES {
            assert_eq!(
                assign_voice(name).gender(),
                VoiceGender::Masculine,
                "name {name}"
            );
        }
    }

    #[test]
    fn feminine_names_never_get_masculine_voices() {
        for name in FEMININE_NAMES {
            assert_eq!(
                assign_voice(name).gender(),
                VoiceGender::Feminine,
                "name {name}"
            );
        }
    }

    #[test]
    fn full_name_hash_spreads_over_both_masculine_voices() {
        let voices: std::collections::HashSet<Voice> = [
            "Ricardo Alves",
            "Ricardo Souza",
            "Carlos Pereira",
            "Pedro Santos",
            "Rafael Costa",
        ]
        .iter()
        .map(|n| assign_voice(n))
        .collect();
        assert!(voices.len() > 1, "hash never picked the second voice");
    }

    #[test]
    fn diacritics_and_case_are_normalized() {
        assert_eq!(assign_voice("João Silva").gender(), VoiceGender::Masculine);
        assert_eq!(assign_voice("LETÍCIA").gender(), VoiceGender::Feminine);
        assert_eq!(assign_voice("Antônio"), assign_voice("Antônio"));
    }

    #[test]
    fn suffix_heuristic_applies_to_unknown_names() {
        // Not in either name set; endings decide.
        assert_eq!(assign_voice("Evandro"), Voice::Echo);
        assert_eq!(assign_voice("Clarinda"), Voice::Fable);
    }

    #[test]
    fn undetermined_names_get_neutral_voice() {
        assert_eq!(assign_voice("Noel"), Voice::Alloy);
    }

    #[test]
    fn fnv1a64_matches_reference_vectors() {
        // Published FNV-1a test vectors.
        assert_eq!(fnv1a64(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a64("a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a64("foobar"), 0x85944171f73967e8);
    }

    #[derive(Debug)]
    struct CannedLlm(Option<String>);

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn chat(&self, _system: &str, _user: &str) -> PipelineResult<String> {
            match &self.0 {
                Some(reply) => Ok(reply.clone()),
                None => Err(PipelineError::RemoteService("offline".to_string())),
            }
        }
    }

    fn sample_config() -> PodcastConfig {
        PodcastConfig::new("T", "x", 2, Tone::Educational, "geral", "conversa")
    }

    #[tokio::test]
    async fn generated_personas_carry_assigned_voices() {
        let reply = r#"{
            "persona1": {"name": "Mariana Castro", "role": "Especialista",
                         "personality": "didática", "expertise": "tecnologia",
                         "speaking_style": "clara", "background": "pesquisadora"},
            "persona2": {"name": "Carlos Mota", "role": "Mediador",
                         "personality": "curioso", "expertise": "comunicação",
                         "speaking_style": "informal", "background": "jornalista"}
        }"#;
        let generator = PersonaGenerator::new(Arc::new(CannedLlm(Some(reply.to_string()))));
        let (first, second) = generator
            .generate(&ContentAnalysis::fallback(), &sample_config())
            .await;

        assert_eq!(first.voice.gender(), VoiceGender::Feminine);
        assert_eq!(second.voice.gender(), VoiceGender::Masculine);
        assert_eq!(first.tone, Tone::Educational);
        assert_eq!(first.voice, assign_voice("Mariana Castro"));
    }

    #[tokio::test]
    async fn failure_returns_default_pair_with_voices_set() {
        let generator = PersonaGenerator::new(Arc::new(CannedLlm(None)));
        let (first, second) = generator
            .generate(&ContentAnalysis::fallback(), &sample_config())
            .await;
        assert_eq!(first.name, "Ana Paula");
        assert_eq!(first.voice, Voice::Fable);
        assert_eq!(second.name, "Ricardo");
        assert_eq!(second.voice, Voice::Echo);
    }
}
