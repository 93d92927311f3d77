//! Grid structure for the three calendar views.
//!
//! Everything here is a plain description of rows and cells; the web and
//! terminal front ends turn it into markup or text. A fresh grid is built on
//! every render, nothing carries over from the previous pass.

use chrono::{
  Datelike,
  NaiveDate
};

use crate::datetime::{
  add_days,
  first_day_of_month,
  format_input_date,
  is_weekend,
  last_day_of_month,
  start_of_week
};
use crate::view::{
  ViewMode,
  ViewState
};

pub const HOURS_PER_DAY: u32 = 24;
pub const BUCKET_HOURS: u32 = 2;
pub const BUCKET_MINUTES: u32 =
  BUCKET_HOURS * 60;

const WEEKDAY_LABELS: [&str; 7] = [
  "Mon", "Tue", "Wed", "Thu", "Fri",
  "Sat", "Sun"
];

/// Identity of a grid cell for the current render pass.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub enum CellKey {
  Slot { date: NaiveDate, hour: u32 },
  Day(NaiveDate)
}

impl CellKey {
  pub fn date(&self) -> NaiveDate {
    match self {
      | Self::Slot { date, .. }
      | Self::Day(date) => *date
    }
  }

  /// Value for the `data-date` attribute.
  pub fn date_key(&self) -> String {
    format_input_date(self.date())
  }
}

/// Start hour of the two-hour bucket holding `hour`.
pub fn bucket_for_hour(hour: u32) -> u32 {
  (hour / BUCKET_HOURS) * BUCKET_HOURS
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayHeader {
  pub date:    NaiveDate,
  /// `Mon`
  pub weekday: String,
  /// `Mar 15`
  pub label:   String,
  pub today:   bool,
  pub weekend: bool
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
  pub key:      CellKey,
  pub today:    bool,
  pub weekend:  bool,
  /// Day belongs to a neighbouring month (monthly view only).
  pub overflow: bool
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRow {
  pub hour:  u32,
  /// `06:00-08:00`
  pub label: String,
  pub cells: Vec<GridCell>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeGrid {
  pub headers: Vec<DayHeader>,
  pub rows:    Vec<BucketRow>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekRow {
  pub start: NaiveDate,
  /// `26/2 - 3/3`
  pub label: String,
  pub cells: Vec<GridCell>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
  pub year:     i32,
  pub month:    u32,
  pub weekdays: Vec<String>,
  pub weeks:    Vec<WeekRow>
}

impl MonthGrid {
  pub fn first_date(
    &self
  ) -> Option<NaiveDate> {
    self
      .weeks
      .first()
      .map(|week| week.start)
  }

  pub fn last_date(
    &self
  ) -> Option<NaiveDate> {
    self
      .weeks
      .last()
      .map(|week| add_days(week.start, 6))
  }

  pub fn cells(
    &self
  ) -> impl Iterator<Item = &GridCell> {
    self
      .weeks
      .iter()
      .flat_map(|week| week.cells.iter())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridLayout {
  Timed(TimeGrid),
  Month(MonthGrid)
}

impl GridLayout {
  pub fn has_cell(
    &self,
    key: &CellKey
  ) -> bool {
    match self {
      | Self::Timed(grid) => grid
        .rows
        .iter()
        .flat_map(|row| row.cells.iter())
        .any(|cell| &cell.key == key),
      | Self::Month(grid) => {
        grid.cells().any(|cell| {
          &cell.key == key
        })
      }
    }
  }
}

/// First column of the timed grid: the anchor for the hourly view, the
/// Monday on or before it for the weekly view.
///
/// The fetch window still starts at the anchor, so with a mid-week anchor
/// the weekly columns before it stay empty until the user navigates there.
pub fn timed_grid_start(
  state: &ViewState
) -> NaiveDate {
  match state.mode {
    | ViewMode::Weekly => {
      start_of_week(state.anchor)
    }
    | _ => state.anchor
  }
}

pub fn build_grid(
  state: &ViewState,
  today: NaiveDate
) -> GridLayout {
  match state.mode {
    | ViewMode::Hourly => {
      GridLayout::Timed(
        build_time_grid(
          state.anchor,
          3,
          today
        )
      )
    }
    | ViewMode::Weekly => {
      GridLayout::Timed(
        build_time_grid(
          timed_grid_start(state),
          7,
          today
        )
      )
    }
    | ViewMode::Monthly => {
      GridLayout::Month(
        build_month_grid(
          state.anchor,
          today
        )
      )
    }
  }
}

pub fn build_time_grid(
  start: NaiveDate,
  days: i64,
  today: NaiveDate
) -> TimeGrid {
  let dates = (0..days)
    .map(|offset| add_days(start, offset))
    .collect::<Vec<_>>();

  let headers = dates
    .iter()
    .map(|date| DayHeader {
      date:    *date,
      weekday: date
        .format("%a")
        .to_string(),
      label:   date
        .format("%b %-d")
        .to_string(),
      today:   *date == today,
      weekend: is_weekend(*date)
    })
    .collect();

  let rows = (0..HOURS_PER_DAY)
    .step_by(BUCKET_HOURS as usize)
    .map(|hour| BucketRow {
      hour,
      label: format!(
        "{:02}:00-{:02}:00",
        hour,
        hour + BUCKET_HOURS
      ),
      cells: dates
        .iter()
        .map(|date| GridCell {
          key:      CellKey::Slot {
            date: *date,
            hour
          },
          today:    *date == today,
          weekend:  is_weekend(*date),
          overflow: false
        })
        .collect()
    })
    .collect();

  TimeGrid { headers, rows }
}

/// Whole weeks from the Monday on or before the 1st through the week holding
/// the last day of the anchor's month.
pub fn build_month_grid(
  anchor: NaiveDate,
  today: NaiveDate
) -> MonthGrid {
  let (year, month) =
    (anchor.year(), anchor.month());
  let first =
    first_day_of_month(year, month);
  let last =
    last_day_of_month(year, month);
  let grid_start = start_of_week(first);
  let week_count = ((last - grid_start)
    .num_days()
    / 7)
    + 1;

  let weeks = (0..week_count)
    .map(|week| {
      let start =
        add_days(grid_start, week * 7);
      let end = add_days(start, 6);
      WeekRow {
        start,
        label: format!(
          "{}/{} - {}/{}",
          start.day(),
          start.month(),
          end.day(),
          end.month()
        ),
        cells: (0..7)
          .map(|offset| {
            let date =
              add_days(start, offset);
            GridCell {
              key:      CellKey::Day(date),
              today:    date == today,
              weekend:  is_weekend(date),
              overflow: date.month()
                != month
                || date.year() != year
            }
          })
          .collect()
      }
    })
    .collect();

  MonthGrid {
    year,
    month,
    weekdays: WEEKDAY_LABELS
      .iter()
      .map(|label| label.to_string())
      .collect(),
    weeks
  }
}
