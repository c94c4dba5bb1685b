use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Local;

use crate::alarm::model::{AlarmConfig, PreAlarmProfile};
use crate::alarm::resolve::ResolvedAlarm;
use crate::audio::{AudioBackend, Playback};

const RAMP_TICK: Duration = Duration::from_secs(1);

/// Interactive command delivered by the stdin listener while a wait is in
/// progress. Anything the listener does not recognize never reaches the
/// scheduler.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Command {
    Fire,
    Kill,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Phase {
    Ring,
    Shutdown,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum WaitOutcome {
    Elapsed,
    Fire,
    Kill,
}

/// Owns one alarm for the process lifetime: the validated config, its
/// resolved fire instant, the audio collaborator, and the command channel.
/// Single cooperative thread; at most one deadline is outstanding at a time.
pub struct Scheduler {
    config: AlarmConfig,
    resolved: ResolvedAlarm,
    audio: Box<dyn AudioBackend>,
    commands: Receiver<Command>,
    playback: Option<Box<dyn Playback>>,
}

impl Scheduler {
    pub fn new(
        config: AlarmConfig,
        resolved: ResolvedAlarm,
        audio: Box<dyn AudioBackend>,
        commands: Receiver<Command>,
    ) -> Self {
        Self {
            config,
            resolved,
            audio,
            commands,
            playback: None,
        }
    }

    /// Run the alarm to completion. Returns once the alarm has been killed;
    /// all audio is stopped and the output muted on every path out.
    pub fn run(mut self) -> Result<()> {
        let now = Local::now();
        let remaining = self
            .resolved
            .seconds_from(&now)
            .try_into()
            .map_or(Duration::ZERO, Duration::from_secs);
        let fire_deadline = Instant::now() + remaining;

        let phase = self.armed_wait(fire_deadline)?;
        if phase == Phase::Ring {
            self.ring_main()?;
        }
        self.shutdown()
    }

    /// Armed state: sleep either to the pre-alarm lead or straight to the
    /// fire instant, whichever applies.
    fn armed_wait(&mut self, fire_deadline: Instant) -> Result<Phase> {
        if let Some(profile) = self.config.pre_alarm {
            let lead = Duration::from_secs(profile.duration_secs());
            if fire_deadline > Instant::now() + lead {
                return match wait_for_deadline(&self.commands, fire_deadline - lead) {
                    WaitOutcome::Elapsed => self.ring_pre_alarm(&profile, fire_deadline),
                    WaitOutcome::Fire => Ok(Phase::Ring),
                    WaitOutcome::Kill => Ok(Phase::Shutdown),
                };
            }
        }
        match wait_for_deadline(&self.commands, fire_deadline) {
            WaitOutcome::Elapsed | WaitOutcome::Fire => Ok(Phase::Ring),
            WaitOutcome::Kill => Ok(Phase::Shutdown),
        }
    }

    fn ring_pre_alarm(
        &mut self,
        profile: &PreAlarmProfile,
        fire_deadline: Instant,
    ) -> Result<Phase> {
        println!("pre-alarm ringing");
        match *profile {
            PreAlarmProfile::ConstantVolume { volume_percent, .. } => {
                self.audio.set_output_volume(volume_percent)?;
                self.playback = Some(self.audio.play_looped(&self.config.sound_file)?);
                match wait_for_deadline(&self.commands, fire_deadline) {
                    WaitOutcome::Elapsed | WaitOutcome::Fire => Ok(Phase::Ring),
                    WaitOutcome::Kill => Ok(Phase::Shutdown),
                }
            }
            PreAlarmProfile::LinearRamp { duration_secs } => {
                self.audio.set_output_volume(0)?;
                self.playback = Some(self.audio.play_looped(&self.config.sound_file)?);
                loop {
                    let remaining = fire_deadline
                        .saturating_duration_since(Instant::now())
                        .as_secs();
                    if remaining == 0 {
                        return Ok(Phase::Ring);
                    }
                    let elapsed = duration_secs.saturating_sub(remaining);
                    let target =
                        ramp_target_volume(elapsed, duration_secs, self.config.volume_percent);
                    self.audio.set_output_volume(target)?;
                    match wait_for_deadline(&self.commands, Instant::now() + RAMP_TICK) {
                        WaitOutcome::Elapsed => {}
                        WaitOutcome::Fire => return Ok(Phase::Ring),
                        WaitOutcome::Kill => return Ok(Phase::Shutdown),
                    }
                }
            }
        }
    }

    /// Terminal ring: full volume, looped playback, no timeout. Only a kill
    /// command leaves this state.
    fn ring_main(&mut self) -> Result<()> {
        println!(
            "alarm ringing at {}%, send kill to stop",
            self.config.volume_percent
        );
        self.stop_playback()?;
        self.audio.set_output_volume(self.config.volume_percent)?;
        self.playback = Some(self.audio.play_looped(&self.config.sound_file)?);
        loop {
            match self.commands.recv() {
                Ok(Command::Kill) => return Ok(()),
                Ok(Command::Fire) => {}
                // command channel gone; ring until the process is killed
                Err(_) => thread::park(),
            }
        }
    }

    fn shutdown(mut self) -> Result<()> {
        self.stop_playback()?;
        self.audio.set_output_volume(0)?;
        Ok(())
    }

    fn stop_playback(&mut self) -> Result<()> {
        if let Some(mut playback) = self.playback.take() {
            playback.stop()?;
        }
        Ok(())
    }
}

/// Target volume at `elapsed_secs` into a linear ramp. Floor of the linear
/// interpolation; reaches exactly `volume_percent` at the end of the ramp.
fn ramp_target_volume(elapsed_secs: u64, duration_secs: u64, volume_percent: u8) -> u8 {
    if duration_secs == 0 {
        return volume_percent;
    }
    let elapsed = elapsed_secs.min(duration_secs);
    ((elapsed * u64::from(volume_percent)) / duration_secs) as u8
}

/// The single cancellable-wait primitive: sleep until `deadline` unless a
/// command arrives first. The command handler (the match on the outcome)
/// always runs to completion before any wait is re-entered.
fn wait_for_deadline(commands: &Receiver<Command>, deadline: Instant) -> WaitOutcome {
    let now = Instant::now();
    if now >= deadline {
        return WaitOutcome::Elapsed;
    }
    match commands.recv_timeout(deadline - now) {
        Ok(Command::Fire) => WaitOutcome::Fire,
        Ok(Command::Kill) => WaitOutcome::Kill,
        Err(RecvTimeoutError::Timeout) => WaitOutcome::Elapsed,
        Err(RecvTimeoutError::Disconnected) => {
            // stdin is gone; finish the sleep without command preemption
            thread::sleep(deadline.saturating_duration_since(Instant::now()));
            WaitOutcome::Elapsed
        }
    }
}
