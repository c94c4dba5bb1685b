mod alarm;
mod audio;
mod audio_process;
mod audio_silent;
mod input;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use clap::{Parser, ValueEnum};
use directories::BaseDirs;

use crate::alarm::model::{
    AlarmConfig, ClockTime, ConfigError, HourMode, PreAlarmProfile, Recurrence,
    clock_minutes_ahead, parse_config_text, parse_record_str,
};
use crate::alarm::resolve::ResolvedAlarm;
use crate::alarm::scheduler::Scheduler;
use crate::audio::{AudioBackendKind, SelectedAudioBackend, select_backend};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliAudioBackend {
    Auto,
    Process,
    Silent,
}

impl From<CliAudioBackend> for AudioBackendKind {
    fn from(value: CliAudioBackend) -> Self {
        match value {
            CliAudioBackend::Auto => AudioBackendKind::Auto,
            CliAudioBackend::Process => AudioBackendKind::Process,
            CliAudioBackend::Silent => AudioBackendKind::Silent,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "wakebell",
    version,
    about = "Single-alarm wall clock with pre-alarm volume ramp"
)]
struct Cli {
    /// Config store location; defaults to ~/wakebell/.config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Alarm name to select from the config store
    #[arg(long)]
    name: Option<String>,

    /// One flat config record instead of the store
    #[arg(long = "config-str", value_name = "RECORD")]
    config_str: Option<String>,

    /// Arm a two-minute smoke-test alarm with the given sound file
    #[arg(long = "test-alarm", value_name = "SOUND_FILE")]
    test_alarm: Option<PathBuf>,

    /// Validate and resolve the alarm, print the schedule, then exit
    #[arg(long)]
    diagnostics: bool,

    #[arg(long, value_enum, default_value_t = CliAudioBackend::Auto)]
    audio_backend: CliAudioBackend,

    /// ALSA mixer control the output volume is applied to
    #[arg(long, default_value = "PCM")]
    mixer_control: String,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let now = Local::now();
    let resolved = ResolvedAlarm::for_config(&config, &now)?;
    let selected = select_backend(cli.audio_backend.into(), &cli.mixer_control)?;

    if cli.diagnostics {
        print_diagnostics(&config, &resolved, &selected, &now);
        return Ok(());
    }

    announce(&config, &resolved, &selected, &now);

    let (commands_tx, commands_rx) = mpsc::channel();
    input::spawn_stdin_listener(commands_tx);
    Scheduler::new(config, resolved, selected.backend, commands_rx).run()
}

fn load_config(cli: &Cli) -> Result<AlarmConfig> {
    if let Some(sound) = &cli.test_alarm {
        return test_alarm_config(sound);
    }
    if let Some(record) = &cli.config_str {
        return Ok(parse_record_str(record)?);
    }

    let path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let content = fs::read_to_string(&path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    parse_config_text(&content, cli.name.as_deref())
        .with_context(|| format!("invalid config file {}", path.display()))
}

fn default_config_path() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine the home directory")?;
    Ok(base.home_dir().join("wakebell").join(".config"))
}

/// Smoke-test mode: alarm two minutes out, near-full volume, one-minute
/// linear ramp.
fn test_alarm_config(sound: &Path) -> Result<AlarmConfig> {
    if !sound.is_file() {
        bail!(ConfigError::SoundFile(sound.display().to_string()));
    }
    Ok(AlarmConfig {
        name: Some("test".to_string()),
        clock: clock_minutes_ahead(&Local::now(), 2),
        mode: HourMode::Hour24,
        recurrence: Recurrence::EveryDay,
        volume_percent: 96,
        sound_file: sound.to_path_buf(),
        pre_alarm: Some(PreAlarmProfile::LinearRamp { duration_secs: 60 }),
        snooze_enabled: false,
    })
}

fn announce(
    config: &AlarmConfig,
    resolved: &ResolvedAlarm,
    selected: &SelectedAudioBackend,
    now: &DateTime<Local>,
) {
    let seconds = resolved.seconds_from(now);
    println!(
        "setting alarm for {} in {seconds} sec",
        resolved.fire_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(profile) = &config.pre_alarm
        && seconds > profile.duration_secs() as i64
    {
        println!(
            "pre-alarm starts {} min before the alarm",
            profile.duration_secs() / 60
        );
    }
    if let Some(reason) = selected.fallback_reason.as_deref() {
        println!("Fallback reason: {reason}");
    }
    println!("interactive commands: fire (ring now), kill (stop and exit)");
}

fn print_diagnostics(
    config: &AlarmConfig,
    resolved: &ResolvedAlarm,
    selected: &SelectedAudioBackend,
    now: &DateTime<Local>,
) {
    println!("wakebell diagnostics");
    println!("Alarm name: {}", config.name.as_deref().unwrap_or("-"));
    println!("Alarm clock time: {}", format_clock(config.clock, config.mode));
    println!("Sound file: {}", config.sound_file.display());
    println!("Alarm volume: {}%", config.volume_percent);
    println!("Fire time: {}", resolved.fire_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Seconds to alarm: {}", resolved.seconds_from(now));
    match &config.pre_alarm {
        Some(PreAlarmProfile::ConstantVolume {
            volume_percent,
            duration_secs,
        }) => println!(
            "Pre-alarm: constant {volume_percent}% for {} min",
            duration_secs / 60
        ),
        Some(PreAlarmProfile::LinearRamp { duration_secs }) => {
            println!("Pre-alarm: linear ramp over {} min", duration_secs / 60);
        }
        None => println!("Pre-alarm: none"),
    }
    println!("Snooze enabled: {}", config.snooze_enabled);
    println!("Selected audio backend: {}", selected.label);
    if let Some(reason) = selected.fallback_reason.as_deref() {
        println!("Fallback reason: {reason}");
    }
}

fn format_clock(clock: ClockTime, mode: HourMode) -> String {
    let suffix = match mode {
        HourMode::Hour24 => "",
        HourMode::Am => " AM",
        HourMode::Pm => " PM",
    };
    format!("{:02}:{:02}{suffix}", clock.hour, clock.minute)
}
