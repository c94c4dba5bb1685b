use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result, bail};

use crate::audio::{AudioBackend, Playback};

/// Audio through external collaborators: `mpg123` for looped playback and
/// `amixer` for the process-wide output volume.
pub struct ProcessAudioBackend {
    mixer_control: String,
}

impl ProcessAudioBackend {
    /// Probes for the player up front so a missing install fails before any
    /// timer is armed.
    pub fn try_new(mixer_control: &str) -> Result<Self> {
        let status = Command::new("mpg123")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) if status.success() => Ok(Self {
                mixer_control: mixer_control.to_string(),
            }),
            Ok(status) => bail!("mpg123 probe exited with {status}"),
            Err(err) => bail!("mpg123 not found on PATH: {err}"),
        }
    }
}

impl AudioBackend for ProcessAudioBackend {
    fn play_looped(&mut self, source: &Path) -> Result<Box<dyn Playback>> {
        let child = Command::new("mpg123")
            .args(["--loop", "-1"])
            .arg(source)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start mpg123 for {}", source.display()))?;
        Ok(Box::new(ProcessPlayback {
            child,
            stopped: false,
        }))
    }

    fn set_output_volume(&mut self, percent: u8) -> Result<()> {
        let status = Command::new("amixer")
            .arg("set")
            .arg(&self.mixer_control)
            .arg("--")
            .arg(format!("{percent}%"))
            .stdout(Stdio::null())
            .status()
            .context("failed to run amixer")?;
        if !status.success() {
            bail!("amixer set {} failed with {status}", self.mixer_control);
        }
        Ok(())
    }
}

struct ProcessPlayback {
    child: Child,
    stopped: bool,
}

impl Playback for ProcessPlayback {
    fn stop(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        self.child.kill().context("failed to stop audio player")?;
        self.child
            .wait()
            .context("failed to reap audio player process")?;
        Ok(())
    }
}

impl Drop for ProcessPlayback {
    fn drop(&mut self) {
        if !self.stopped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
