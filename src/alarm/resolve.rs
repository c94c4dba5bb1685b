use chrono::{
    DateTime, Datelike, Days, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike, Weekday,
};
use thiserror::Error;

use crate::alarm::model::{AlarmConfig, ClockTime, HourMode, Recurrence};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("alarm time does not map to a valid local instant")]
    Unrepresentable,
}

/// The absolute instant the alarm fires, derived once per arming. Re-arming
/// computes a fresh value; a fired alarm is never mutated.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAlarm {
    pub fire_at: DateTime<Local>,
}

impl ResolvedAlarm {
    pub fn for_config(config: &AlarmConfig, now: &DateTime<Local>) -> Result<Self, ResolveError> {
        resolve_in_tz(config.clock, config.mode, config.recurrence, now, &Local)
            .map(|fire_at| Self { fire_at })
            .ok_or(ResolveError::Unrepresentable)
    }

    pub fn seconds_from(&self, now: &DateTime<Local>) -> i64 {
        (self.fire_at - *now).num_seconds()
    }
}

/// Map a configured time-of-day and recurrence onto the next fire instant.
/// Pure: depends only on its arguments.
pub fn resolve_in_tz<Tz>(
    clock: ClockTime,
    mode: HourMode,
    recurrence: Recurrence,
    now: &DateTime<Tz>,
    timezone: &Tz,
) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let hour = normalize_hour(clock.hour, mode);
    let candidate_ahead =
        hour > now.hour() || (hour == now.hour() && clock.minute > now.minute());
    let offset_days = day_offset(recurrence, now.date_naive().weekday(), candidate_ahead);
    let candidate = candidate_today(now.date_naive(), hour, clock.minute, timezone)?;
    // Whole 86 400-second steps, not calendar days: two EveryDay resolutions
    // a day apart differ by exactly one day's worth of seconds.
    Some(candidate + chrono::Duration::seconds(offset_days * 86_400))
}

/// Normalize a raw config hour into the 24h scale. In 24h mode the hour is
/// clamped to at most 24 and kept literally: 24 always compares as still
/// ahead of `now` and the built candidate carries into midnight tomorrow.
pub fn normalize_hour(raw: u32, mode: HourMode) -> u32 {
    match mode {
        HourMode::Hour24 => raw.min(24),
        HourMode::Am => {
            let hour = raw.min(12);
            if hour == 12 { 0 } else { hour }
        }
        HourMode::Pm => {
            let hour = raw.min(12) + 12;
            if hour == 24 { 12 } else { hour }
        }
    }
}

fn candidate_today<Tz>(
    date: NaiveDate,
    hour: u32,
    minute: u32,
    timezone: &Tz,
) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let (date, hour) = if hour == 24 {
        (date.checked_add_days(Days::new(1))?, 0)
    } else {
        (date, hour)
    };
    let naive = date.and_time(NaiveTime::from_hms_opt(hour, minute, 0)?);
    resolve_local_datetime(timezone, naive)
}

fn resolve_local_datetime<Tz>(timezone: &Tz, naive: chrono::NaiveDateTime) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(first, _second) => Some(first),
        LocalResult::None => {
            // spring-forward gap: the wall time does not exist, take the
            // instant one hour later
            let shifted = naive.checked_add_signed(chrono::Duration::hours(1))?;
            match timezone.from_local_datetime(&shifted) {
                LocalResult::Single(dt) => Some(dt),
                LocalResult::Ambiguous(first, _second) => Some(first),
                LocalResult::None => None,
            }
        }
    }
}

/// Calendar-day offset from today for the candidate, per recurrence class.
/// Weekday index is Monday = 0 .. Sunday = 6.
fn day_offset(recurrence: Recurrence, weekday: Weekday, candidate_ahead: bool) -> i64 {
    let index = i64::from(weekday.num_days_from_monday());
    match recurrence {
        Recurrence::EveryDay => {
            if candidate_ahead { 0 } else { 1 }
        }
        Recurrence::NextOccurrenceOnly => 1,
        Recurrence::Weekdays => {
            if index < 5 {
                if candidate_ahead {
                    0
                } else if index == 4 {
                    // Friday evening rolls past the weekend
                    3
                } else {
                    1
                }
            } else {
                // weekend, land on Monday
                7 - index
            }
        }
        Recurrence::Weekend => {
            if index < 5 {
                // land on Saturday
                5 - index
            } else if candidate_ahead {
                0
            } else if index == 6 {
                // Sunday evening rolls to next Saturday
                6
            } else {
                1
            }
        }
    }
}
