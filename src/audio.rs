use crate::encoder::AudioEncoder;
use crate::error::PipelineResult;
use crate::model::{Persona, PodcastSegment};
use crate::speech::{SpeechClient, SynthesisRequest};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Used when neither the clip header nor the file size gives a duration.
pub const DEFAULT_SEGMENT_DURATION: f64 = 5.0;

/// Rough size-based estimate: 24 kHz mono 16-bit PCM.
const ESTIMATED_BYTES_PER_SEC: f64 = 48_000.0;

const MIN_ESTIMATED_DURATION: f64 = 1.0;
const MAX_ESTIMATED_DURATION: f64 = 60.0;

/// Knobs for the synthesis stage; defaults mirror
/// [`crate::config::SpeechSettings`].
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    pub max_input_chars: usize,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub speed: f32,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            max_input_chars: 4000,
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            speed: 1.0,
        }
    }
}

/// What the synthesis stage produced for one segment: always a path, audio
/// when possible, the textual fallback artifact otherwise. `degraded`
/// carries the reason when the fallback was taken.
#[derive(Debug)]
pub struct SegmentAudio {
    pub path: PathBuf,
    pub duration: f64,
    pub degraded: Option<String>,
}

/// The delay before each retry, doubling from the initial value. One entry
/// fewer than the attempt count.
pub fn backoff_schedule(max_attempts: u32, initial: Duration) -> Vec<Duration> {
    (0..max_attempts.saturating_sub(1))
        .map(|attempt| initial * 2u32.pow(attempt))
        .collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((boundary, _)) => &text[..boundary],
        None => text,
    }
}

/// Per-segment speech synthesis with retry, backoff and a textual fallback
/// artifact. Each call owns exactly one segment; the caller addresses
/// segments by index and writes results back itself.
pub struct AudioGenerator {
    speech: Arc<dyn SpeechClient>,
    encoder: Arc<dyn AudioEncoder>,
    build_dir: PathBuf,
    options: SynthesisOptions,
}

impl AudioGenerator {
    pub fn new(
        speech: Arc<dyn SpeechClient>,
        encoder: Arc<dyn AudioEncoder>,
        build_dir: impl Into<PathBuf>,
        options: SynthesisOptions,
    ) -> Self {
        Self {
            speech,
            encoder,
            build_dir: build_dir.into(),
            options,
        }
    }

    /// Never fails: after `max_attempts` failed attempts the segment gets a
    /// fallback artifact recording the failure and the original text, so
    /// assembly never sees a segment without a path.
    pub async fn synthesize(
        &self,
        index: usize,
        segment: &PodcastSegment,
        persona: &Persona,
    ) -> SegmentAudio {
        let text = truncate_chars(&segment.text, self.options.max_input_chars);
        let request = SynthesisRequest {
            voice: persona.voice,
            text: text.to_string(),
            instructions: voice_instructions(persona),
            speed: self.options.speed,
        };
        let output = self.build_dir.join(format!("chunk_{index:04}.wav"));

        let mut delay = self.options.initial_backoff;
        let mut last_error = String::new();
        for attempt in 1..=self.options.max_attempts {
            match self.attempt(&request, &output).await {
                Ok(()) => {
                    let duration = self.resolve_duration(&output);
                    info!(
                        "segment {index}: voice {} ready ({duration:.1}s)",
                        persona.voice.id()
                    );
                    return SegmentAudio {
                        path: output,
                        duration,
                        degraded: None,
                    };
                }
                Err(err) => {
                    warn!(
                        "segment {index}: attempt {attempt}/{} failed: {err}",
                        self.options.max_attempts
                    );
                    last_error = err.to_string();
                    if attempt < self.options.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        self.write_failure_note(index, segment, &last_error)
    }

    async fn attempt(&self, request: &SynthesisRequest, output: &Path) -> PipelineResult<()> {
        self.speech.synthesize(request, output).await?;
        let meta = std::fs::metadata(output)?;
        if meta.len() == 0 {
            return Err(crate::error::PipelineError::RemoteService(
                "speech service produced an empty file".to_string(),
            ));
        }
        Ok(())
    }

    /// Header duration when the clip parses, file-size estimate clamped to
    /// [1, 60] seconds otherwise, constant default as the last resort.
    fn resolve_duration(&self, path: &Path) -> f64 {
        if let Ok(duration) = self.encoder.duration_of(path) {
            return duration;
        }
        if let Ok(meta) = std::fs::metadata(path) {
            return (meta.len() as f64 / ESTIMATED_BYTES_PER_SEC)
                .clamp(MIN_ESTIMATED_DURATION, MAX_ESTIMATED_DURATION);
        }
        DEFAULT_SEGMENT_DURATION
    }

    /// Terminal per-segment fallback, shared by retry exhaustion and the
    /// stage-level timeout path.
    pub fn write_failure_note(
        &self,
        index: usize,
        segment: &PodcastSegment,
        reason: &str,
    ) -> SegmentAudio {
        let path = self.build_dir.join(format!("chunk_{index:04}.failed.txt"));
        let note = format!(
            "ERRO: não foi possível gerar áudio para este segmento.\nMotivo: {reason}\n\nFalante: {}\nTexto original:\n{}\n",
            segment.speaker, segment.text
        );
        if let Err(err) = std::fs::write(&path, note) {
            warn!("segment {index}: could not write fallback note: {err}");
        }
        warn!("segment {index}: degraded to fallback artifact {path:?}");
        SegmentAudio {
            path,
            duration: DEFAULT_SEGMENT_DURATION,
            degraded: Some(reason.to_string()),
        }
    }
}

fn voice_instructions(persona: &Persona) -> String {
    format!(
        "Fale em português brasileiro natural e fluente. Use sotaque brasileiro típico. \
         Mantenha {}. Evite sotaque estrangeiro.",
        persona.speaking_style
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::tests::dummy_wav;
    use crate::encoder::WavEncoder;
    use crate::error::PipelineError;
    use crate::model::Tone;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn backoff_doubles_from_initial_delay() {
        let schedule = backoff_schedule(3, Duration::from_secs(2));
        assert_eq!(schedule, vec![Duration::from_secs(2), Duration::from_secs(4)]);
        assert!(backoff_schedule(1, Duration::from_secs(2)).is_empty());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("olá você", 3), "olá");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("ação", 2), "aç");
    }

    /// Fails `failures` times, then writes a valid clip.
    struct FlakySpeech {
        failures: u32,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl SpeechClient for FlakySpeech {
        async fn synthesize(
            &self,
            _request: &SynthesisRequest,
            output: &Path,
        ) -> PipelineResult<()> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls <= self.failures {
                return Err(PipelineError::RemoteService("mock outage".to_string()));
            }
            std::fs::write(output, dummy_wav(96_000, 7))?;
            Ok(())
        }
    }

    fn generator(speech: Arc<dyn SpeechClient>, dir: &Path) -> AudioGenerator {
        let options = SynthesisOptions {
            initial_backoff: Duration::from_secs(0),
            ..SynthesisOptions::default()
        };
        AudioGenerator::new(speech, Arc::new(WavEncoder), dir, options)
    }

    fn segment() -> (PodcastSegment, Persona) {
        let (persona, _) = Persona::fallback_pair(Tone::Casual);
        (PodcastSegment::new(&persona.name, "Olá pessoal!"), persona)
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt_with_three_calls() {
        let dir = tempfile::tempdir().unwrap();
        let speech = Arc::new(FlakySpeech {
            failures: 2,
            calls: Mutex::new(0),
        });
        let gen = generator(speech.clone(), dir.path());
        let (seg, persona) = segment();

        let produced = gen.synthesize(0, &seg, &persona).await;

        assert_eq!(*speech.calls.lock().unwrap(), 3);
        assert!(produced.degraded.is_none());
        assert!(produced.path.exists());
        assert!((produced.duration - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn exhausted_retries_leave_fallback_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let speech = Arc::new(FlakySpeech {
            failures: u32::MAX,
            calls: Mutex::new(0),
        });
        let gen = generator(speech.clone(), dir.path());
        let (seg, persona) = segment();

        let produced = gen.synthesize(3, &seg, &persona).await;

        assert_eq!(*speech.calls.lock().unwrap(), 3);
        assert_eq!(produced.degraded.as_deref(), Some("remote service error: mock outage"));
        assert!(produced.path.ends_with("chunk_0003.failed.txt"));
        let note = std::fs::read_to_string(&produced.path).unwrap();
        assert!(note.contains("Olá pessoal!"));
        assert!(note.contains("mock outage"));
        assert_eq!(produced.duration, DEFAULT_SEGMENT_DURATION);
    }

    /// Writes an unparseable blob so duration falls back to the size
    /// estimate.
    struct OpaqueSpeech;

    #[async_trait]
    impl SpeechClient for OpaqueSpeech {
        async fn synthesize(
            &self,
            _request: &SynthesisRequest,
            output: &Path,
        ) -> PipelineResult<()> {
            std::fs::write(output, vec![9u8; 480])?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn size_estimate_is_clamped_to_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(Arc::new(OpaqueSpeech), dir.path());
        let (seg, persona) = segment();

        let produced = gen.synthesize(0, &seg, &persona).await;
        // 480 bytes would be 0.01 s; the clamp floors it at 1 s.
        assert!((produced.duration - 1.0).abs() < 1e-9);
    }

    /// Creates the file but leaves it empty, which counts as a failure.
    struct EmptyFileSpeech;

    #[async_trait]
    impl SpeechClient for EmptyFileSpeech {
        async fn synthesize(
            &self,
            _request: &SynthesisRequest,
            output: &Path,
        ) -> PipelineResult<()> {
            std::fs::write(output, b"")?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn empty_output_file_is_treated_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(Arc::new(EmptyFileSpeech), dir.path());
        let (seg, persona) = segment();

        let produced = gen.synthesize(0, &seg, &persona).await;
        assert!(produced.degraded.is_some());
        assert!(produced.path.extension().is_some_and(|e| e == "txt"));
    }
}
