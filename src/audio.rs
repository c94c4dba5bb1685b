use std::path::Path;

use anyhow::{Result, anyhow};

use crate::audio_process::ProcessAudioBackend;
use crate::audio_silent::SilentAudioBackend;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AudioBackendKind {
    Auto,
    Process,
    Silent,
}

/// A running playback owned by the scheduler. Stopping releases the
/// underlying player; implementations also release on drop so no exit path
/// leaks a player process.
pub trait Playback {
    fn stop(&mut self) -> Result<()>;
}

pub trait AudioBackend {
    fn play_looped(&mut self, source: &Path) -> Result<Box<dyn Playback>>;
    fn set_output_volume(&mut self, percent: u8) -> Result<()>;
}

pub struct SelectedAudioBackend {
    pub backend: Box<dyn AudioBackend>,
    pub label: &'static str,
    pub fallback_reason: Option<String>,
}

pub fn select_backend(kind: AudioBackendKind, mixer_control: &str) -> Result<SelectedAudioBackend> {
    match kind {
        AudioBackendKind::Silent => Ok(SelectedAudioBackend {
            backend: Box::new(SilentAudioBackend::new()),
            label: "SILENT",
            fallback_reason: None,
        }),
        AudioBackendKind::Process => {
            let backend = ProcessAudioBackend::try_new(mixer_control)
                .map_err(|err| anyhow!("audio player unavailable: {err}"))?;
            Ok(SelectedAudioBackend {
                backend: Box::new(backend),
                label: "MPG123_AMIXER",
                fallback_reason: None,
            })
        }
        AudioBackendKind::Auto => match ProcessAudioBackend::try_new(mixer_control) {
            Ok(backend) => Ok(SelectedAudioBackend {
                backend: Box::new(backend),
                label: "MPG123_AMIXER",
                fallback_reason: None,
            }),
            Err(err) => Ok(SelectedAudioBackend {
                backend: Box::new(SilentAudioBackend::new()),
                label: "SILENT",
                fallback_reason: Some(format!(
                    "Audio player not detected, alarms will be silent: {err}"
                )),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_backend_accepts_every_call() {
        let selected = select_backend(AudioBackendKind::Silent, "PCM").expect("silent backend");
        assert_eq!(selected.label, "SILENT");
        assert!(selected.fallback_reason.is_none());

        let mut backend = selected.backend;
        backend.set_output_volume(40).expect("volume accepted");
        let mut playback = backend
            .play_looped(Path::new("bell.mp3"))
            .expect("playback accepted");
        playback.stop().expect("stop accepted");
    }

    #[test]
    fn auto_selection_never_fails() {
        let selected = select_backend(AudioBackendKind::Auto, "PCM").expect("auto backend");
        match selected.label {
            "MPG123_AMIXER" => assert!(selected.fallback_reason.is_none()),
            "SILENT" => assert!(selected.fallback_reason.is_some()),
            other => panic!("unexpected backend label {other}"),
        }
    }
}
