use chrono::NaiveDate;
use serde::{
  Serialize,
  Serializer
};
use thiserror::Error;

use crate::datetime::format_input_date;

pub const DEFAULT_GENERATE_COUNT: u32 = 3;
pub const MAX_GENERATE_COUNT: u32 = 12;

#[derive(
  Debug, Clone, PartialEq, Eq, Error,
)]
pub enum GenerateError {
  #[error("Please select a template first")]
  NoTemplate,

  #[error("Months must be between 1 and 12")]
  CountOutOfRange(i64)
}

/// A checked request to stamp a template onto the calendar.
///
/// The apply endpoint names the count `num_weeks` and bounds it to the same
/// `1..=12` range the form enforces for months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
  #[serde(skip)]
  pub template_id: String,
  #[serde(serialize_with = "input_date")]
  pub start_date:  NaiveDate,
  #[serde(rename = "num_weeks")]
  pub count:       u32
}

impl GenerateRequest {
  /// Validates the generation form before anything is sent. An empty or
  /// unparsable count falls back to three.
  pub fn from_form(
    template_id: Option<&str>,
    count_raw: &str,
    start_date: NaiveDate
  ) -> Result<Self, GenerateError> {
    let template_id = template_id
      .map(str::trim)
      .filter(|id| !id.is_empty())
      .ok_or(GenerateError::NoTemplate)?;

    let count = leading_integer(count_raw)
      .filter(|count| *count != 0)
      .unwrap_or(i64::from(
        DEFAULT_GENERATE_COUNT
      ));
    if !(1..=i64::from(MAX_GENERATE_COUNT))
      .contains(&count)
    {
      tracing::warn!(
        count,
        "rejecting generation count"
      );
      return Err(
        GenerateError::CountOutOfRange(
          count
        )
      );
    }

    Ok(Self {
      template_id: template_id
        .to_string(),
      start_date,
      count: count as u32
    })
  }
}

fn input_date<S>(
  value: &NaiveDate,
  serializer: S
) -> Result<S::Ok, S::Error>
where
  S: Serializer
{
  serializer.serialize_str(
    &format_input_date(*value)
  )
}

/// Integer prefix of `raw` after leading whitespace, so `"7.9"` reads as 7
/// and `"5abc"` as 5.
fn leading_integer(raw: &str) -> Option<i64> {
  let trimmed = raw.trim_start();
  let digits_from = usize::from(
    trimmed.starts_with(['-', '+'])
  );
  let end = trimmed[digits_from..]
    .find(|c: char| !c.is_ascii_digit())
    .map_or(trimmed.len(), |offset| {
      digits_from + offset
    });
  trimmed[..end].parse().ok()
}
