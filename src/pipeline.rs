use crate::analyzer::ContentAnalyzer;
use crate::assembler::PodcastAssembler;
use crate::audio::{AudioGenerator, SegmentAudio, SynthesisOptions};
use crate::config::Settings;
use crate::encoder::AudioEncoder;
use crate::error::{PipelineError, PipelineResult};
use crate::llm::LlmClient;
use crate::model::{Persona, PodcastConfig, PodcastSegment};
use crate::persona::PersonaGenerator;
use crate::script::{BrazilianPortuguese, ScriptGenerator};
use crate::speech::SpeechClient;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Stages of one run, in order. Transitions only move forward; stage
/// failures degrade inside the stage instead of moving the run backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Analyzing,
    PersonaGen,
    Scripting,
    Synthesizing,
    Assembling,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Analyzing => "analyzing",
            RunStage::PersonaGen => "persona-gen",
            RunStage::Scripting => "scripting",
            RunStage::Synthesizing => "synthesizing",
            RunStage::Assembling => "assembling",
            RunStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Sequences the five stages and fans the synthesis stage out over a
/// bounded worker pool. Every stage absorbs its own failures, so a run has
/// no failure state besides local I/O when creating its working folders or
/// writing the terminal transcript.
pub struct PodcastGenerator {
    analyzer: ContentAnalyzer,
    personas: PersonaGenerator,
    script: ScriptGenerator,
    audio: AudioGenerator,
    assembler: PodcastAssembler,
    build_dir: PathBuf,
    output_dir: PathBuf,
    max_concurrency: usize,
    segment_timeout: Duration,
    silence_ms: u32,
}

impl PodcastGenerator {
    pub fn new(
        settings: &Settings,
        llm: Arc<dyn LlmClient>,
        speech: Arc<dyn SpeechClient>,
        encoder: Arc<dyn AudioEncoder>,
    ) -> Self {
        let options = SynthesisOptions {
            max_input_chars: settings.speech.max_input_chars,
            max_attempts: settings.speech.max_attempts,
            initial_backoff: Duration::from_secs(settings.speech.initial_backoff_secs),
            speed: settings.speech.speed,
        };
        Self {
            analyzer: ContentAnalyzer::new(llm.clone()),
            personas: PersonaGenerator::new(llm.clone()),
            script: ScriptGenerator::new(llm, Box::new(BrazilianPortuguese)),
            audio: AudioGenerator::new(
                speech,
                encoder.clone(),
                &settings.build_folder,
                options,
            ),
            assembler: PodcastAssembler::new(
                encoder,
                &settings.output_folder,
                settings.speech.silence_ms,
            ),
            build_dir: PathBuf::from(&settings.build_folder),
            output_dir: PathBuf::from(&settings.output_folder),
            max_concurrency: settings.speech.max_concurrency,
            segment_timeout: Duration::from_secs(settings.speech.segment_timeout_secs),
            silence_ms: settings.speech.silence_ms,
        }
    }

    /// Runs the whole pipeline and returns the path of the deliverable
    /// artifact: the assembled program, or the transcript fallback.
    pub async fn generate(
        &self,
        content: &str,
        config: &PodcastConfig,
    ) -> PipelineResult<PathBuf> {
        std::fs::create_dir_all(&self.build_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;

        self.enter(RunStage::Analyzing, config);
        let analysis = self.analyzer.analyze(content).await;

        self.enter(RunStage::PersonaGen, config);
        let (persona1, persona2) = self.personas.generate(&analysis, config).await;

        self.enter(RunStage::Scripting, config);
        let mut segments = self
            .script
            .generate(&analysis, &persona1, &persona2, config)
            .await;

        self.enter(RunStage::Synthesizing, config);
        self.synthesize_all(&mut segments, &persona1, &persona2).await;
        self.assign_timestamps(&mut segments);

        self.enter(RunStage::Assembling, config);
        let artifact = self.assembler.assemble(&segments, config)?;

        self.enter(RunStage::Done, config);
        info!("run complete: {artifact:?}");
        Ok(artifact)
    }

    /// Analysis, personas and script only; nothing is synthesized.
    pub async fn preview_script(
        &self,
        content: &str,
        config: &PodcastConfig,
    ) -> Vec<PodcastSegment> {
        let analysis = self.analyzer.analyze(content).await;
        let (persona1, persona2) = self.personas.generate(&analysis, config).await;
        self.script
            .generate(&analysis, &persona1, &persona2, config)
            .await
    }

    /// The parallel region. Each worker owns exactly one segment index and
    /// reports `(index, SegmentAudio)`; completions are harvested in
    /// whatever order they arrive and written back through the index, so
    /// the script order survives any interleaving of the pool.
    async fn synthesize_all(
        &self,
        segments: &mut [PodcastSegment],
        persona1: &Persona,
        persona2: &Persona,
    ) {
        if segments.is_empty() {
            return;
        }
        let workers = self.max_concurrency.min(segments.len()).max(1);
        info!(
            "synthesizing {} segments with {workers} parallel workers",
            segments.len()
        );

        let errors: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let progress = ProgressBar::new(segments.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let audio = &self.audio;
        let deadline = self.segment_timeout;

        let results: Vec<(usize, SegmentAudio)> =
            futures_util::stream::iter(segments.iter().enumerate())
                .map(|(index, segment)| {
                    let persona = if segment.speaker == persona2.name {
                        persona2
                    } else {
                        persona1
                    };
                    let errors = Arc::clone(&errors);
                    let progress = progress.clone();
                    async move {
                        let produced =
                            match tokio::time::timeout(deadline, audio.synthesize(index, segment, persona))
                                .await
                            {
                                Ok(produced) => produced,
                                Err(_) => {
                                    let err = PipelineError::SynthesisTimeout {
                                        seconds: deadline.as_secs(),
                                    };
                                    audio.write_failure_note(index, segment, &err.to_string())
                                }
                            };
                        if let Some(reason) = &produced.degraded {
                            if let Ok(mut list) = errors.lock() {
                                list.push(format!("segmento {}: {reason}", index + 1));
                            }
                        }
                        progress.inc(1);
                        (index, produced)
                    }
                })
                .buffer_unordered(workers)
                .collect()
                .await;

        progress.finish_and_clear();

        // Write-back by index: one producer per slot, script order restored
        // regardless of completion order.
        for (index, produced) in results {
            let slot = &mut segments[index];
            slot.audio_path = Some(produced.path);
            slot.duration = produced.duration;
        }

        let degraded = errors.lock();
        if let Ok(list) = degraded {
            if !list.is_empty() {
                warn!("{} segment(s) degraded during synthesis:", list.len());
                for entry in list.iter().take(3) {
                    warn!("  - {entry}");
                }
                if list.len() > 3 {
                    warn!("  ... and {} more", list.len() - 3);
                }
            }
        }
    }

    /// Cumulative playback offsets, counting the inter-clip silences the
    /// assembler will insert.
    fn assign_timestamps(&self, segments: &mut [PodcastSegment]) {
        let gap = f64::from(self.silence_ms) / 1000.0;
        let mut offset = 0.0;
        for segment in segments.iter_mut() {
            segment.timestamp = offset;
            offset += segment.duration + gap;
        }
    }

    fn enter(&self, stage: RunStage, config: &PodcastConfig) {
        info!("[{stage}] {}", config.title);
    }
}
