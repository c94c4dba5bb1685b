use std::path::PathBuf;

use chrono::{DateTime, Local, Timelike};
use thiserror::Error;

pub const RECORD_FIELDS: [&str; 8] = [
    "name",
    "alarm_time",
    "am_pm",
    "days",
    "alarm_volume",
    "alarm_sound_file",
    "prealarm_profile",
    "snooze_enable",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid alarm_time '{0}', expected HH:MM")]
    Clock(String),
    #[error("invalid am_pm value '{0}', expected one of: am, AM, pm, PM, 24")]
    HourMode(String),
    #[error("invalid days value '{0}', expected one of: next, all, weekdays, weekend")]
    Recurrence(String),
    #[error("invalid alarm_volume '{0}', expected an integer between 0 and 100")]
    Volume(String),
    #[error("alarm sound file does not exist: {0}")]
    SoundFile(String),
    #[error("invalid prealarm_profile '{0}'")]
    Profile(String),
    #[error("prealarm ramp length must be greater than zero minutes")]
    ZeroRamp,
    #[error("config record has {found} fields, expected {expected}")]
    FieldCount { expected: usize, found: usize },
    #[error("config header must be '{expected}'")]
    Header { expected: String },
    #[error("no alarm named '{0}' in config")]
    UnknownAlarm(String),
    #[error("config contains no alarm rows")]
    Empty,
}

/// Raw hour and minute as written in the config. The hour is left
/// un-normalized here; the resolver applies the 24h/am/pm rules so its
/// comparison semantics stay in one place.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum HourMode {
    Hour24,
    Am,
    Pm,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Recurrence {
    EveryDay,
    NextOccurrenceOnly,
    Weekdays,
    Weekend,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PreAlarmProfile {
    ConstantVolume { volume_percent: u8, duration_secs: u64 },
    LinearRamp { duration_secs: u64 },
}

impl PreAlarmProfile {
    pub fn duration_secs(&self) -> u64 {
        match *self {
            PreAlarmProfile::ConstantVolume { duration_secs, .. } => duration_secs,
            PreAlarmProfile::LinearRamp { duration_secs } => duration_secs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlarmConfig {
    pub name: Option<String>,
    pub clock: ClockTime,
    pub mode: HourMode,
    pub recurrence: Recurrence,
    pub volume_percent: u8,
    pub sound_file: PathBuf,
    pub pre_alarm: Option<PreAlarmProfile>,
    /// Advisory only; no snooze transition is defined.
    pub snooze_enabled: bool,
}

/// One record in store order, before validation.
struct RawRecord<'a> {
    name: &'a str,
    alarm_time: &'a str,
    am_pm: &'a str,
    days: &'a str,
    alarm_volume: &'a str,
    alarm_sound_file: &'a str,
    prealarm_profile: &'a str,
    snooze_enable: &'a str,
}

impl<'a> RawRecord<'a> {
    fn from_fields(fields: &[&'a str]) -> Result<Self, ConfigError> {
        if fields.len() != RECORD_FIELDS.len() {
            return Err(ConfigError::FieldCount {
                expected: RECORD_FIELDS.len(),
                found: fields.len(),
            });
        }
        Ok(Self {
            name: fields[0],
            alarm_time: fields[1],
            am_pm: fields[2],
            days: fields[3],
            alarm_volume: fields[4],
            alarm_sound_file: fields[5],
            prealarm_profile: fields[6],
            snooze_enable: fields[7],
        })
    }

    fn validate(&self) -> Result<AlarmConfig, ConfigError> {
        let clock = parse_clock(self.alarm_time)?;
        let mode = parse_hour_mode(self.am_pm)?;
        let recurrence = parse_recurrence(self.days)?;
        let volume_percent = self
            .alarm_volume
            .parse::<u8>()
            .ok()
            .filter(|volume| *volume <= 100)
            .ok_or_else(|| ConfigError::Volume(self.alarm_volume.to_string()))?;
        let sound_file = PathBuf::from(self.alarm_sound_file);
        if !sound_file.is_file() {
            return Err(ConfigError::SoundFile(self.alarm_sound_file.to_string()));
        }
        let pre_alarm = parse_pre_alarm_profile(self.prealarm_profile)?;
        Ok(AlarmConfig {
            name: (!self.name.is_empty()).then(|| self.name.to_string()),
            clock,
            mode,
            recurrence,
            volume_percent,
            sound_file,
            pre_alarm,
            snooze_enabled: parse_bool_like(self.snooze_enable),
        })
    }
}

/// Parse one flat record in store field order (no header).
pub fn parse_record_str(record: &str) -> Result<AlarmConfig, ConfigError> {
    let fields: Vec<&str> = record.split(',').map(str::trim).collect();
    RawRecord::from_fields(&fields)?.validate()
}

/// Parse the config store: a header line naming the record fields followed
/// by one record per line. With `name` set, only matching rows apply;
/// without it every row is applied in order and the last one wins.
pub fn parse_config_text(content: &str, name: Option<&str>) -> Result<AlarmConfig, ConfigError> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let header = lines.next().ok_or(ConfigError::Empty)?;
    let header_fields: Vec<&str> = header.split(',').map(str::trim).collect();
    if header_fields != RECORD_FIELDS {
        return Err(ConfigError::Header {
            expected: RECORD_FIELDS.join(","),
        });
    }

    let mut selected = None;
    for line in lines {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let record = RawRecord::from_fields(&fields)?;
        if name.is_none_or(|wanted| wanted == record.name) {
            selected = Some(record.validate()?);
        }
    }
    selected.ok_or_else(|| match name {
        Some(wanted) => ConfigError::UnknownAlarm(wanted.to_string()),
        None => ConfigError::Empty,
    })
}

fn parse_clock(input: &str) -> Result<ClockTime, ConfigError> {
    let err = || ConfigError::Clock(input.to_string());
    let (hour, minute) = input.split_once(':').ok_or_else(err)?;
    let hour = parse_two_digits(hour).ok_or_else(err)?;
    let minute = parse_two_digits(minute).ok_or_else(err)?;
    if minute > 59 {
        return Err(err());
    }
    Ok(ClockTime { hour, minute })
}

fn parse_two_digits(field: &str) -> Option<u32> {
    if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn parse_hour_mode(tag: &str) -> Result<HourMode, ConfigError> {
    match tag {
        "24" => Ok(HourMode::Hour24),
        "am" | "AM" => Ok(HourMode::Am),
        "pm" | "PM" => Ok(HourMode::Pm),
        other => Err(ConfigError::HourMode(other.to_string())),
    }
}

fn parse_recurrence(tag: &str) -> Result<Recurrence, ConfigError> {
    match tag {
        "all" => Ok(Recurrence::EveryDay),
        "next" => Ok(Recurrence::NextOccurrenceOnly),
        "weekdays" => Ok(Recurrence::Weekdays),
        "weekend" => Ok(Recurrence::Weekend),
        other => Err(ConfigError::Recurrence(other.to_string())),
    }
}

/// Profile grammar: `0-<volume>-<minutes>` holds a constant volume for the
/// lead window (`0-0-<minutes>` disables the pre-alarm), `1-<minutes>` ramps
/// linearly from silent up to the alarm volume.
pub fn parse_pre_alarm_profile(input: &str) -> Result<Option<PreAlarmProfile>, ConfigError> {
    let err = || ConfigError::Profile(input.to_string());
    let fields: Vec<&str> = input.split('-').collect();
    match fields.as_slice() {
        ["0", volume, duration] => {
            let volume = parse_digits(volume).filter(|v| *v <= 100).ok_or_else(err)? as u8;
            let duration = u64::from(parse_digits(duration).ok_or_else(err)?);
            if volume == 0 {
                return Ok(None);
            }
            if duration == 0 {
                return Err(ConfigError::ZeroRamp);
            }
            Ok(Some(PreAlarmProfile::ConstantVolume {
                volume_percent: volume,
                duration_secs: duration * 60,
            }))
        }
        ["1", duration] => {
            let duration = u64::from(parse_digits(duration).ok_or_else(err)?);
            if duration == 0 {
                return Err(ConfigError::ZeroRamp);
            }
            Ok(Some(PreAlarmProfile::LinearRamp {
                duration_secs: duration * 60,
            }))
        }
        _ => Err(err()),
    }
}

fn parse_digits(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn parse_bool_like(field: &str) -> bool {
    matches!(
        field.to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Clock time a whole number of minutes after `now`, wrapping at midnight.
/// Used by the smoke-test alarm mode.
pub fn clock_minutes_ahead(now: &DateTime<Local>, minutes: u32) -> ClockTime {
    let total = now.minute() + minutes;
    ClockTime {
        hour: (now.hour() + total / 60) % 24,
        minute: total % 60,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::TimeZone;
    use tempfile::tempdir;

    use super::*;

    fn config_with_sound(sound: &str) -> String {
        format!(
            "name,alarm_time,am_pm,days,alarm_volume,alarm_sound_file,prealarm_profile,snooze_enable\n\
             workday,06:30,24,weekdays,80,{sound},1-15,false\n\
             lazy,09:15,am,weekend,60,{sound},0-0-10,true\n"
        )
    }

    #[test]
    fn parses_valid_config_row_by_name() {
        let dir = tempdir().expect("tempdir");
        let sound = dir.path().join("bell.mp3");
        fs::write(&sound, b"mp3").expect("write sound");
        let content = config_with_sound(&sound.display().to_string());

        let config = parse_config_text(&content, Some("workday")).expect("valid config");
        assert_eq!(config.name.as_deref(), Some("workday"));
        assert_eq!(config.clock, ClockTime { hour: 6, minute: 30 });
        assert_eq!(config.mode, HourMode::Hour24);
        assert_eq!(config.recurrence, Recurrence::Weekdays);
        assert_eq!(config.volume_percent, 80);
        assert_eq!(
            config.pre_alarm,
            Some(PreAlarmProfile::LinearRamp { duration_secs: 900 })
        );
        assert!(!config.snooze_enabled);
    }

    #[test]
    fn last_row_wins_without_name() {
        let dir = tempdir().expect("tempdir");
        let sound = dir.path().join("bell.mp3");
        fs::write(&sound, b"mp3").expect("write sound");
        let content = config_with_sound(&sound.display().to_string());

        let config = parse_config_text(&content, None).expect("valid config");
        assert_eq!(config.name.as_deref(), Some("lazy"));
        assert_eq!(config.recurrence, Recurrence::Weekend);
        assert!(config.pre_alarm.is_none());
        assert!(config.snooze_enabled);
    }

    #[test]
    fn rejects_unknown_alarm_name() {
        let dir = tempdir().expect("tempdir");
        let sound = dir.path().join("bell.mp3");
        fs::write(&sound, b"mp3").expect("write sound");
        let content = config_with_sound(&sound.display().to_string());

        let err = parse_config_text(&content, Some("nope")).expect_err("unknown name");
        assert!(err.to_string().contains("no alarm named 'nope'"));
    }

    #[test]
    fn rejects_wrong_header() {
        let err =
            parse_config_text("name,alarm_time\nx,06:30\n", None).expect_err("header should fail");
        assert!(matches!(err, ConfigError::Header { .. }));
    }

    #[test]
    fn rejects_field_count_mismatch() {
        let header = RECORD_FIELDS.join(",");
        let err = parse_config_text(&format!("{header}\nonly,three,fields\n"), None)
            .expect_err("short row should fail");
        assert!(matches!(
            err,
            ConfigError::FieldCount {
                expected: 8,
                found: 3
            }
        ));
    }

    #[test]
    fn rejects_missing_sound_file() {
        let err = parse_record_str("x,06:30,24,all,80,/no/such/file.mp3,0-0-1,false")
            .expect_err("missing file should fail");
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn rejects_out_of_range_volume() {
        let dir = tempdir().expect("tempdir");
        let sound = dir.path().join("bell.mp3");
        fs::write(&sound, b"mp3").expect("write sound");

        let record = format!("x,06:30,24,all,150,{},0-0-1,false", sound.display());
        let err = parse_record_str(&record).expect_err("volume should fail");
        assert!(matches!(err, ConfigError::Volume(_)));
    }

    #[test]
    fn rejects_bad_tags() {
        let dir = tempdir().expect("tempdir");
        let sound = dir.path().join("bell.mp3");
        fs::write(&sound, b"mp3").expect("write sound");
        let sound = sound.display();

        let bad_mode = parse_record_str(&format!("x,06:30,maybe,all,80,{sound},0-0-1,false"));
        assert!(matches!(bad_mode, Err(ConfigError::HourMode(_))));

        let bad_days = parse_record_str(&format!("x,06:30,24,fridays,80,{sound},0-0-1,false"));
        assert!(matches!(bad_days, Err(ConfigError::Recurrence(_))));
    }

    #[test]
    fn clock_parsing_is_strict() {
        assert!(parse_clock("06:30").is_ok());
        assert!(parse_clock("24:00").is_ok());
        assert!(matches!(parse_clock("6:30"), Err(ConfigError::Clock(_))));
        assert!(matches!(parse_clock("06-30"), Err(ConfigError::Clock(_))));
        assert!(matches!(parse_clock("06:3a"), Err(ConfigError::Clock(_))));
        assert!(matches!(parse_clock("06:60"), Err(ConfigError::Clock(_))));
        assert!(matches!(parse_clock("+6:30"), Err(ConfigError::Clock(_))));
    }

    #[test]
    fn profile_grammar() {
        assert_eq!(
            parse_pre_alarm_profile("0-10-15").expect("constant profile"),
            Some(PreAlarmProfile::ConstantVolume {
                volume_percent: 10,
                duration_secs: 900
            })
        );
        assert_eq!(
            parse_pre_alarm_profile("0-0-15").expect("disabled profile"),
            None
        );
        assert_eq!(
            parse_pre_alarm_profile("1-10").expect("ramp profile"),
            Some(PreAlarmProfile::LinearRamp { duration_secs: 600 })
        );

        assert!(matches!(
            parse_pre_alarm_profile("1-0"),
            Err(ConfigError::ZeroRamp)
        ));
        assert!(matches!(
            parse_pre_alarm_profile("0-10-0"),
            Err(ConfigError::ZeroRamp)
        ));
        assert!(matches!(
            parse_pre_alarm_profile("0-10"),
            Err(ConfigError::Profile(_))
        ));
        assert!(matches!(
            parse_pre_alarm_profile("1-x"),
            Err(ConfigError::Profile(_))
        ));
        assert!(matches!(
            parse_pre_alarm_profile("2-5"),
            Err(ConfigError::Profile(_))
        ));
        assert!(matches!(
            parse_pre_alarm_profile("0"),
            Err(ConfigError::Profile(_))
        ));
        assert!(matches!(
            parse_pre_alarm_profile(""),
            Err(ConfigError::Profile(_))
        ));
    }

    #[test]
    fn clock_minutes_ahead_wraps_at_midnight() {
        let now = Local
            .with_ymd_and_hms(2026, 8, 6, 23, 59, 10)
            .single()
            .expect("valid time");
        let clock = clock_minutes_ahead(&now, 2);
        assert_eq!(clock, ClockTime { hour: 0, minute: 1 });

        let earlier = Local
            .with_ymd_and_hms(2026, 8, 6, 7, 30, 0)
            .single()
            .expect("valid time");
        assert_eq!(
            clock_minutes_ahead(&earlier, 2),
            ClockTime { hour: 7, minute: 32 }
        );
    }
}
