use std::path::Path;

use anyhow::Result;

use crate::audio::{AudioBackend, Playback};

/// Accepts every call and plays nothing. Used by diagnostics runs and as
/// the fallback when no audio player is installed.
pub struct SilentAudioBackend;

impl SilentAudioBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for SilentAudioBackend {
    fn play_looped(&mut self, _source: &Path) -> Result<Box<dyn Playback>> {
        Ok(Box::new(SilentPlayback))
    }

    fn set_output_volume(&mut self, _percent: u8) -> Result<()> {
        Ok(())
    }
}

struct SilentPlayback;

impl Playback for SilentPlayback {
    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}
