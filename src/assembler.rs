use crate::encoder::AudioEncoder;
use crate::error::PipelineResult;
use crate::model::{PodcastConfig, PodcastSegment};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Final stage: splices the per-segment clips, in original script order,
/// into one program. When no clip is playable or the encoder fails, the
/// terminal fallback is a plain-text transcript, so the caller always gets
/// a deliverable artifact.
pub struct PodcastAssembler {
    encoder: Arc<dyn AudioEncoder>,
    output_dir: PathBuf,
    silence_ms: u32,
}

fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "podcast".to_string()
    } else {
        cleaned
    }
}

impl PodcastAssembler {
    pub fn new(encoder: Arc<dyn AudioEncoder>, output_dir: impl Into<PathBuf>, silence_ms: u32) -> Self {
        Self {
            encoder,
            output_dir: output_dir.into(),
            silence_ms,
        }
    }

    /// The only error this can return is an I/O failure writing the
    /// transcript fallback itself; every other problem degrades.
    pub fn assemble(
        &self,
        segments: &[PodcastSegment],
        config: &PodcastConfig,
    ) -> PipelineResult<PathBuf> {
        let stem = sanitize_title(&config.title);
        let audio_output = self.output_dir.join(format!("{stem}.wav"));

        // Fallback .txt artifacts are deliberately skipped here; they are
        // not audio and must not reach the encoder.
        let playable: Vec<PathBuf> = segments
            .iter()
            .filter_map(|segment| segment.audio_path.clone())
            .filter(|path| path.extension().is_some_and(|ext| ext == "wav") && path.exists())
            .collect();

        if playable.is_empty() {
            warn!("no playable clips at all; writing transcript fallback");
            return self.write_transcript(&stem, segments);
        }
        if playable.len() < segments.len() {
            warn!(
                "{} of {} segments have no playable audio and will be missing from the program",
                segments.len() - playable.len(),
                segments.len()
            );
        }

        match self
            .encoder
            .concatenate(&playable, &audio_output, self.silence_ms)
        {
            Ok(()) => {
                info!("program assembled at {audio_output:?}");
                Ok(audio_output)
            }
            Err(err) => {
                warn!("concatenation failed ({err}); writing transcript fallback");
                self.write_transcript(&stem, segments)
            }
        }
    }

    fn write_transcript(
        &self,
        stem: &str,
        segments: &[PodcastSegment],
    ) -> PipelineResult<PathBuf> {
        let path = self.output_dir.join(format!("{stem}.txt"));
        let mut body = String::new();
        body.push_str("# Podcast Gerado por IA\n");
        body.push_str("# Roteiro completo do podcast\n\n");
        for (i, segment) in segments.iter().enumerate() {
            body.push_str(&format!("## Segmento {} - {}\n", i + 1, segment.speaker));
            body.push_str(&segment.text);
            body.push_str("\n\n");
            if let Some(audio_path) = &segment.audio_path {
                body.push_str(&format!("Arquivo de áudio: {}\n\n", audio_path.display()));
            }
        }
        body.push_str("---\n");

        std::fs::write(&path, body)?;
        info!("transcript fallback written to {path:?}");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::tests::dummy_wav;
    use crate::encoder::WavEncoder;
    use crate::model::Tone;

    fn config() -> PodcastConfig {
        PodcastConfig::new("Meu Episódio", "IA", 1, Tone::Casual, "geral", "conversa")
    }

    fn assembler(dir: &std::path::Path) -> PodcastAssembler {
        PodcastAssembler::new(Arc::new(WavEncoder), dir, 800)
    }

    #[test]
    fn sanitizes_titles_for_filenames() {
        assert_eq!(sanitize_title("IA nos Negócios"), "IA_nos_Negócios");
        assert_eq!(sanitize_title("a/b"), "a_b");
        assert_eq!(sanitize_title(""), "podcast");
    }

    #[test]
    fn assembles_playable_clips_in_segment_order() -> PipelineResult<()> {
        let dir = tempfile::tempdir()?;
        let mut segments = Vec::new();
        for i in 0..3u8 {
            let clip = dir.path().join(format!("chunk_{i}.wav"));
            std::fs::write(&clip, dummy_wav(50, i + 1))?;
            let mut segment = PodcastSegment::new("Ana Paula", format!("turno {i}"));
            segment.audio_path = Some(clip);
            segments.push(segment);
        }

        let output = assembler(dir.path()).assemble(&segments, &config())?;
        assert_eq!(output.extension().unwrap(), "wav");

        // First payload byte after the 44-byte header comes from clip 1.
        let bytes = std::fs::read(&output)?;
        assert_eq!(bytes[44], 1);
        assert_eq!(*bytes.last().unwrap(), 3);
        Ok(())
    }

    #[test]
    fn all_fallback_segments_produce_transcript() -> PipelineResult<()> {
        let dir = tempfile::tempdir()?;
        let note = dir.path().join("chunk_0000.failed.txt");
        std::fs::write(&note, "ERRO")?;

        let mut first = PodcastSegment::new("Ana Paula", "Olá pessoal!");
        first.audio_path = Some(note);
        let second = PodcastSegment::new("Ricardo", "Tudo bem?");

        let output = assembler(dir.path()).assemble(&[first, second], &config())?;
        assert_eq!(output.extension().unwrap(), "txt");

        let transcript = std::fs::read_to_string(&output)?;
        assert!(transcript.contains("Segmento 1 - Ana Paula"));
        assert!(transcript.contains("Olá pessoal!"));
        assert!(transcript.contains("Segmento 2 - Ricardo"));
        assert!(transcript.contains("chunk_0000.failed.txt"));
        Ok(())
    }

    #[test]
    fn encoder_failure_degrades_to_transcript() -> PipelineResult<()> {
        let dir = tempfile::tempdir()?;
        // Valid extension, invalid contents: the encoder rejects it.
        let clip = dir.path().join("bad.wav");
        std::fs::write(&clip, b"not audio at all")?;
        let mut segment = PodcastSegment::new("Ana Paula", "Olá!");
        segment.audio_path = Some(clip);

        let output = assembler(dir.path()).assemble(&[segment], &config())?;
        assert_eq!(output.extension().unwrap(), "txt");
        Ok(())
    }

    #[test]
    fn missing_files_are_not_sent_to_the_encoder() -> PipelineResult<()> {
        let dir = tempfile::tempdir()?;
        let mut gone = PodcastSegment::new("Ana Paula", "sumiu");
        gone.audio_path = Some(dir.path().join("nunca_existiu.wav"));

        let ok_clip = dir.path().join("ok.wav");
        std::fs::write(&ok_clip, dummy_wav(50, 9))?;
        let mut ok = PodcastSegment::new("Ricardo", "presente");
        ok.audio_path = Some(ok_clip);

        let output = assembler(dir.path()).assemble(&[gone, ok], &config())?;
        assert_eq!(output.extension().unwrap(), "wav");
        Ok(())
    }
}
