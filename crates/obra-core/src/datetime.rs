use std::fmt;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use chrono::{
  DateTime,
  Datelike,
  Duration,
  FixedOffset,
  Local,
  NaiveDate,
  NaiveDateTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "obra-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "OBRA_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "OBRA_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// The zone in which instants are
/// truncated to calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanningZone {
  Local,
  Named(Tz)
}

impl fmt::Display for PlanningZone {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | PlanningZone::Local => {
        f.write_str("local")
      }
      | PlanningZone::Named(tz) => {
        write!(f, "{tz}")
      }
    }
  }
}

impl PlanningZone {
  #[must_use]
  pub fn day_of<Z: chrono::TimeZone>(
    &self,
    instant: &DateTime<Z>
  ) -> NaiveDate {
    match self {
      | PlanningZone::Local => {
        instant
          .with_timezone(&Local)
          .date_naive()
      }
      | PlanningZone::Named(tz) => {
        instant
          .with_timezone(tz)
          .date_naive()
      }
    }
  }

  #[must_use]
  pub fn today(&self) -> NaiveDate {
    self.day_of(&Utc::now())
  }
}

/// Picks the planning zone: the
/// `OBRA_TIMEZONE` variable, then the rc
/// value, then `obra-time.toml`, then the
/// system zone.
#[tracing::instrument]
pub fn resolve_planning_zone(
  configured: Option<&str>
) -> PlanningZone {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return PlanningZone::Named(tz);
  }

  if let Some(raw) = configured
    && let Some(tz) = parse_timezone(
      raw,
      "calendar.timezone"
    )
  {
    return PlanningZone::Named(tz);
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return PlanningZone::Named(tz);
  }

  tracing::debug!(
    "no planning timezone configured; \
     using system local time"
  );
  PlanningZone::Local
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &Path
) -> Option<Tz> {
  if !path.exists() {
    tracing::trace!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "resolved planning timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "invalid timezone id"
      );
      None
    }
  }
}

/// Resolves a stored date string to the
/// calendar day it falls on. Returns
/// `None` for anything unparseable; the
/// caller treats that as unscheduled.
#[must_use]
pub fn parse_task_day(
  raw: &str,
  zone: PlanningZone
) -> Option<NaiveDate> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  if let Ok(instant) =
    DateTime::<FixedOffset>::parse_from_rfc3339(
      trimmed
    )
  {
    return Some(zone.day_of(&instant));
  }

  if let Ok(naive) =
    NaiveDateTime::parse_from_str(
      trimmed,
      "%Y%m%dT%H%M%SZ"
    )
  {
    let instant =
      DateTime::<Utc>::from_naive_utc_and_offset(
        naive, Utc
      );
    return Some(zone.day_of(&instant));
  }

  for format in [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S"
  ] {
    if let Ok(naive) =
      NaiveDateTime::parse_from_str(
        trimmed, format
      )
    {
      return Some(naive.date());
    }
  }

  NaiveDate::parse_from_str(
    trimmed, "%Y-%m-%d"
  )
  .ok()
}

#[must_use]
pub fn format_iso_day(
  day: NaiveDate
) -> String {
  day.format("%Y-%m-%d").to_string()
}

pub fn parse_week_start(
  raw: &str
) -> Option<Weekday> {
  match raw
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "monday" | "mon" | "lunes" => {
      Some(Weekday::Mon)
    }
    | "sunday" | "sun" | "domingo" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let mut year = date.year();
  let mut month =
    date.month() as i32 + months;

  while month < 1 {
    month += 12;
    year = year.saturating_sub(1);
  }
  while month > 12 {
    month -= 12;
    year = year.saturating_add(1);
  }

  let month = month as u32;
  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// With a Monday start, Sunday sits six
/// days after the Monday that opens its
/// week.
pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

pub fn end_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  add_days(
    start_of_week(day, week_start),
    6
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parses_plain_and_naive_dates() {
    let zone = PlanningZone::Named(
      chrono_tz::UTC
    );
    assert_eq!(
      parse_task_day("2024-03-05", zone),
      Some(date(2024, 3, 5))
    );
    assert_eq!(
      parse_task_day(
        "2024-03-05T23:30:00",
        zone
      ),
      Some(date(2024, 3, 5))
    );
    assert_eq!(
      parse_task_day(
        "20240305T101500Z",
        zone
      ),
      Some(date(2024, 3, 5))
    );
  }

  #[test]
  fn offset_instants_follow_planning_zone(
  ) {
    let madrid = PlanningZone::Named(
      chrono_tz::Europe::Madrid
    );
    assert_eq!(
      parse_task_day(
        "2024-03-05T23:30:00Z",
        madrid
      ),
      Some(date(2024, 3, 6))
    );

    let mexico = PlanningZone::Named(
      chrono_tz::America::Mexico_City
    );
    assert_eq!(
      parse_task_day(
        "2024-03-05T03:00:00Z",
        mexico
      ),
      Some(date(2024, 3, 4))
    );
  }

  #[test]
  fn malformed_dates_resolve_to_none() {
    let zone = PlanningZone::Local;
    assert_eq!(
      parse_task_day("", zone),
      None
    );
    assert_eq!(
      parse_task_day("mañana", zone),
      None
    );
    assert_eq!(
      parse_task_day("2024-02-30", zone),
      None
    );
  }

  #[test]
  fn week_starts_on_monday_and_sunday_wraps(
  ) {
    assert_eq!(
      start_of_week(
        date(2024, 1, 10),
        Weekday::Mon
      ),
      date(2024, 1, 8)
    );
    assert_eq!(
      start_of_week(
        date(2024, 1, 14),
        Weekday::Mon
      ),
      date(2024, 1, 8)
    );
    assert_eq!(
      start_of_week(
        date(2024, 1, 14),
        Weekday::Sun
      ),
      date(2024, 1, 14)
    );
  }

  #[test]
  fn month_shift_clamps_day() {
    assert_eq!(
      shift_months(date(2024, 1, 31), 1),
      date(2024, 2, 29)
    );
    assert_eq!(
      shift_months(date(2024, 1, 15), -1),
      date(2023, 12, 15)
    );
    assert_eq!(
      shift_months(
        date(2024, 12, 31),
        1
      ),
      date(2025, 1, 31)
    );
  }

  #[test]
  fn week_start_names() {
    assert_eq!(
      parse_week_start("Sunday"),
      Some(Weekday::Sun)
    );
    assert_eq!(
      parse_week_start("lunes"),
      Some(Weekday::Mon)
    );
    assert_eq!(
      parse_week_start("friday"),
      None
    );
  }
}
