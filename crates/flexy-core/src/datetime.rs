use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Timelike,
  Utc,
  Weekday
};
use chrono_tz::Tz;

pub const MINUTES_PER_DAY: u32 = 1_440;

const INPUT_DATE_FORMAT: &str =
  "%Y-%m-%d";
const SHIFT_DATETIME_FORMAT: &str =
  "%Y-%m-%d %H:%M";
const CLOCK_FORMAT: &str = "%H:%M";

const ACCEPTED_DATETIME_FORMATS: [&str;
  4] = [
  "%Y-%m-%d %H:%M",
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%dT%H:%M:%S"
];

#[must_use]
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

/// Monday on or before `day`.
#[must_use]
pub fn start_of_week(
  day: NaiveDate
) -> NaiveDate {
  let offset = day
    .weekday()
    .num_days_from_monday()
    as i64;
  add_days(day, -offset)
}

#[must_use]
pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

#[must_use]
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

#[must_use]
pub fn is_weekend(
  date: NaiveDate
) -> bool {
  matches!(
    date.weekday(),
    Weekday::Sat | Weekday::Sun
  )
}

#[must_use]
pub fn today_in_timezone(
  timezone: Tz
) -> NaiveDate {
  Utc::now()
    .with_timezone(&timezone)
    .date_naive()
}

pub fn parse_timezone(
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
    | Ok(tz) => Some(tz),
    | Err(error) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %error,
        "invalid timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn format_input_date(
  date: NaiveDate
) -> String {
  date
    .format(INPUT_DATE_FORMAT)
    .to_string()
}

pub fn parse_input_date(
  raw: &str
) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(
    raw.trim(),
    INPUT_DATE_FORMAT
  )
  .ok()
}

/// `Mar 5, 2024`
#[must_use]
pub fn format_short_date(
  date: NaiveDate
) -> String {
  date.format("%b %-d, %Y").to_string()
}

/// `March 2024`
#[must_use]
pub fn format_month_year(
  date: NaiveDate
) -> String {
  date.format("%B %Y").to_string()
}

#[must_use]
pub fn format_clock(
  time: NaiveTime
) -> String {
  time.format(CLOCK_FORMAT).to_string()
}

pub fn parse_clock(
  raw: &str
) -> Option<NaiveTime> {
  let trimmed = raw.trim();
  NaiveTime::parse_from_str(
    trimmed,
    CLOCK_FORMAT
  )
  .or_else(|_| {
    NaiveTime::parse_from_str(
      trimmed, "%H:%M:%S"
    )
  })
  .ok()
}

#[must_use]
pub fn format_shift_datetime(
  value: NaiveDateTime
) -> String {
  value
    .format(SHIFT_DATETIME_FORMAT)
    .to_string()
}

/// Accepts the backend's `YYYY-MM-DD HH:MM` plus the ISO `T` forms.
pub fn parse_shift_datetime(
  raw: &str
) -> Option<NaiveDateTime> {
  let trimmed = raw.trim();
  ACCEPTED_DATETIME_FORMATS
    .iter()
    .find_map(|format| {
      NaiveDateTime::parse_from_str(
        trimmed, format
      )
      .ok()
    })
}

#[must_use]
pub fn minute_of_day(
  time: NaiveTime
) -> u32 {
  time.hour() * 60 + time.minute()
}

/// Minutes from `start` to `end` on a 24h clock. An end at or before the
/// start wraps past midnight, so the result is always in `1..=1440`.
#[must_use]
pub fn clock_span_minutes(
  start: NaiveTime,
  end: NaiveTime
) -> u32 {
  let start = minute_of_day(start);
  let end = minute_of_day(end);
  if end <= start {
    end + MINUTES_PER_DAY - start
  } else {
    end - start
  }
}
