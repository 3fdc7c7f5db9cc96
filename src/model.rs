use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Conversation tone requested for the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Casual,
    Professional,
    Educational,
    Entertaining,
    Technical,
    Storytelling,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Casual => "casual",
            Tone::Professional => "professional",
            Tone::Educational => "educational",
            Tone::Entertaining => "entertaining",
            Tone::Technical => "technical",
            Tone::Storytelling => "storytelling",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceGender {
    Masculine,
    Feminine,
    Neutral,
}

/// Synthetic voices offered by the speech service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Fable,
    Nova,
    Onyx,
    Sage,
    Shimmer,
}

impl Voice {
    pub fn id(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Ash => "ash",
            Voice::Ballad => "ballad",
            Voice::Coral => "coral",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Nova => "nova",
            Voice::Onyx => "onyx",
            Voice::Sage => "sage",
            Voice::Shimmer => "shimmer",
        }
    }

    pub fn gender(&self) -> VoiceGender {
        match self {
            Voice::Echo | Voice::Onyx => VoiceGender::Masculine,
            Voice::Fable | Voice::Nova | Voice::Shimmer => VoiceGender::Feminine,
            _ => VoiceGender::Neutral,
        }
    }
}

/// Structured result of the content analysis stage. Created once per run
/// and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentAnalysis {
    pub topic: String,
    pub key_points: Vec<String>,
    pub target_audience: String,
    #[serde(default)]
    pub recommended_tone: Tone,
    #[serde(default = "default_complexity")]
    pub complexity_level: u8,
    #[serde(default = "default_estimated_duration", alias = "estimated_duration")]
    pub estimated_duration_minutes: f64,
    #[serde(default)]
    pub discussion_angles: Vec<String>,
    #[serde(default)]
    pub questions_to_explore: Vec<String>,
    #[serde(default)]
    pub examples_and_stories: Vec<String>,
    #[serde(default)]
    pub actionable_insights: Vec<String>,
}

fn default_complexity() -> u8 {
    3
}

fn default_estimated_duration() -> f64 {
    2.0
}

impl ContentAnalysis {
    /// Documented default used when the analysis service fails. The pipeline
    /// keeps going with this degraded result instead of aborting the run.
    pub fn fallback() -> Self {
        Self {
            topic: "Tópico não identificado".to_string(),
            key_points: vec!["Ponto principal".to_string()],
            target_audience: "Público geral".to_string(),
            recommended_tone: Tone::Casual,
            complexity_level: 3,
            estimated_duration_minutes: 2.0,
            discussion_angles: vec!["Visão geral".to_string()],
            questions_to_explore: vec!["Como isso funciona?".to_string()],
            examples_and_stories: vec!["Exemplo prático".to_string()],
            actionable_insights: vec!["Dica prática".to_string()],
        }
    }

    /// Clamps fields that the remote service sometimes returns out of range.
    pub fn clamped(mut self) -> Self {
        self.complexity_level = self.complexity_level.clamp(1, 5);
        self
    }
}

/// A speaker identity. Two complementary personas exist per run; segments
/// reference them by name.
#[derive(Debug, Clone, Serialize)]
pub struct Persona {
    pub name: String,
    pub role: String,
    pub personality: String,
    pub expertise: String,
    pub speaking_style: String,
    pub background: String,
    pub tone: Tone,
    pub voice: Voice,
}

impl Persona {
    /// Default pair used when persona generation fails. Voices are
    /// pre-assigned and gender-consistent with the names.
    pub fn fallback_pair(tone: Tone) -> (Persona, Persona) {
        let expert = Persona {
            name: "Ana Paula".to_string(),
            role: "Especialista".to_string(),
            personality: "Analítica e didática, com sotaque brasileiro natural".to_string(),
            expertise: "Conhecimento técnico profundo com experiência brasileira".to_string(),
            speaking_style: "Clara e estruturada, fala em português brasileiro".to_string(),
            background: "Profissional brasileira experiente".to_string(),
            tone,
            voice: Voice::Fable,
        };
        let host = Persona {
            name: "Ricardo".to_string(),
            role: "Mediador".to_string(),
            personality: "Curioso e questionador, com jeito brasileiro de falar".to_string(),
            expertise: "Comunicação e síntese com foco no público brasileiro".to_string(),
            speaking_style: "Conversacional e envolvente, típico brasileiro".to_string(),
            background: "Comunicador brasileiro experiente".to_string(),
            tone,
            voice: Voice::Echo,
        };
        (expert, host)
    }
}

/// Per-run configuration provided by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastConfig {
    pub title: String,
    pub topic: String,
    pub duration_minutes: u32,
    pub tone: Tone,
    pub target_audience: String,
    pub format_style: String,
    #[serde(default)]
    pub intro_music: bool,
    #[serde(default)]
    pub outro_music: bool,
}

impl PodcastConfig {
    pub fn new(
        title: impl Into<String>,
        topic: impl Into<String>,
        duration_minutes: u32,
        tone: Tone,
        target_audience: impl Into<String>,
        format_style: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            topic: topic.into(),
            duration_minutes: duration_minutes.max(1),
            tone,
            target_audience: target_audience.into(),
            format_style: format_style.into(),
            intro_music: false,
            outro_music: false,
        }
    }
}

/// One speaker turn. The position inside the script vector is the
/// authoritative playback order; nothing downstream may reorder it.
/// `audio_path` and `duration` are written exactly once, by the synthesis
/// stage worker that owns this segment's index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastSegment {
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub audio_path: Option<PathBuf>,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub duration: f64,
}

impl PodcastSegment {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            audio_path: None,
            timestamp: 0.0,
            duration: 0.0,
        }
    }
}
