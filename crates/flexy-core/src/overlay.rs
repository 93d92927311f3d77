use std::cell::Cell;
use std::collections::BTreeMap;

use chrono::{
  NaiveDate,
  Timelike
};

use crate::datetime::clock_span_minutes;
use crate::grid::{
  BUCKET_MINUTES,
  CellKey,
  GridLayout,
  bucket_for_hour
};
use crate::shift::ShiftRecord;
use crate::view::ViewState;

/// Cap on overlay height so a long shift never spills out of its cell.
pub const MAX_HEIGHT_PERCENT: f64 = 98.0;
pub const DEFAULT_MAX_BADGES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct TimedOverlay {
  pub shift_id:       String,
  pub cell:           CellKey,
  pub top_percent:    f64,
  pub height_percent: f64,
  pub initials:       String,
  pub shift_type:     String,
  pub color:          String,
  pub duration:       u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
  pub shift_id: String,
  /// `JD A3`
  pub label:    String,
  pub color:    String
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoreBadge {
  pub hidden:   usize,
  /// Record the `+N more` badge opens: the first one not shown.
  pub opens_id: String
}

impl MoreBadge {
  pub fn label(&self) -> String {
    format!("+{} more", self.hidden)
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct DayBadges {
  pub visible: Vec<Badge>,
  pub more:    Option<MoreBadge>
}

/// Positions shifts for the hourly and weekly grids.
///
/// Records whose start day falls outside the view stride (counted from the
/// anchor) are skipped, as are records whose bucket cell is not part of
/// `layout`.
pub fn place_timed_shifts(
  shifts: &[ShiftRecord],
  state: &ViewState,
  layout: &GridLayout
) -> Vec<TimedOverlay> {
  let stride = state.mode.stride();
  shifts
    .iter()
    .filter_map(|shift| {
      let day_offset = (shift.start_date()
        - state.anchor)
        .num_days();
      if !(0..stride).contains(&day_offset)
      {
        tracing::trace!(
          shift_id = %shift.id,
          day_offset,
          "shift outside visible stride"
        );
        return None;
      }

      let overlay = timed_overlay(shift);
      if layout.has_cell(&overlay.cell) {
        Some(overlay)
      } else {
        tracing::trace!(
          shift_id = %shift.id,
          "no grid cell for shift"
        );
        None
      }
    })
    .collect()
}

pub fn timed_overlay(
  shift: &ShiftRecord
) -> TimedOverlay {
  let start = shift.start.time();
  let duration = clock_span_minutes(
    start,
    shift.end.time()
  );
  let bucket =
    bucket_for_hour(start.hour());
  let into_bucket = (start.hour()
    - bucket)
    * 60
    + start.minute();

  TimedOverlay {
    shift_id: shift.id.clone(),
    cell: CellKey::Slot {
      date: shift.start_date(),
      hour: bucket
    },
    top_percent: f64::from(into_bucket)
      / f64::from(BUCKET_MINUTES)
      * 100.0,
    height_percent: (f64::from(duration)
      / f64::from(BUCKET_MINUTES)
      * 100.0)
      .min(MAX_HEIGHT_PERCENT),
    initials: shift.initials(),
    shift_type: shift.shift_type.clone(),
    color: shift
      .color_or_default()
      .to_string(),
    duration
  }
}

/// Groups shifts by start date, keeping fetch order inside each day.
pub fn group_monthly_badges(
  shifts: &[ShiftRecord],
  max_visible: usize
) -> BTreeMap<NaiveDate, DayBadges> {
  let mut by_day: BTreeMap<
    NaiveDate,
    Vec<&ShiftRecord>
  > = BTreeMap::new();
  for shift in shifts {
    by_day
      .entry(shift.start_date())
      .or_default()
      .push(shift);
  }

  by_day
    .into_iter()
    .map(|(day, records)| {
      let visible = records
        .iter()
        .take(max_visible)
        .map(|shift| Badge {
          shift_id: shift.id.clone(),
          label:    shift.label(),
          color:    shift
            .color_or_default()
            .to_string()
        })
        .collect();
      let more = records
        .get(max_visible)
        .map(|first_hidden| MoreBadge {
          hidden:   records.len()
            - max_visible,
          opens_id: first_hidden
            .id
            .clone()
        });
      (day, DayBadges { visible, more })
    })
    .collect()
}

/// Ticket handed out when a shift fetch starts.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct FetchTicket(u64);

/// Keeps only the most recently requested window's response.
///
/// Every fetch takes a ticket before it is sent; when it settles the caller
/// asks whether that ticket is still the latest. Older responses are dropped
/// so a slow reply can never paint over a newer grid.
#[derive(Debug, Default)]
pub struct FetchSequencer {
  latest:  Cell<u64>,
  loading: Cell<bool>
}

impl FetchSequencer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn begin(&self) -> FetchTicket {
    let next =
      self.latest.get().wrapping_add(1);
    self.latest.set(next);
    self.loading.set(true);
    FetchTicket(next)
  }

  pub fn is_current(
    &self,
    ticket: FetchTicket
  ) -> bool {
    ticket.0 == self.latest.get()
  }

  /// Marks `ticket` as settled and reports whether its result should be
  /// applied. The loading flag clears only when the latest fetch settles.
  pub fn settle(
    &self,
    ticket: FetchTicket
  ) -> bool {
    let current = self.is_current(ticket);
    if current {
      self.loading.set(false);
    } else {
      tracing::debug!(
        ticket = ticket.0,
        latest = self.latest.get(),
        "dropping stale shift response"
      );
    }
    current
  }

  pub fn is_loading(&self) -> bool {
    self.loading.get()
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDateTime;

  use super::*;
  use crate::grid::build_grid;
  use crate::view::ViewMode;

  fn at(raw: &str) -> NaiveDateTime {
    crate::datetime::parse_shift_datetime(
      raw
    )
    .expect("valid datetime")
  }

  fn shift(
    id: &str,
    name: Option<&str>,
    kind: &str,
    start: &str,
    end: &str
  ) -> ShiftRecord {
    ShiftRecord {
      id:             id.to_string(),
      caregiver_id:   "1".to_string(),
      caregiver_name: name
        .map(str::to_string),
      shift_type:     kind.to_string(),
      start:          at(start),
      end:            at(end),
      color:          None
    }
  }

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn timed_overlay_offsets_within_bucket()
  {
    let overlay = timed_overlay(&shift(
      "1",
      Some("Jane Doe"),
      "A3",
      "2024-03-15 07:00",
      "2024-03-15 14:00"
    ));
    assert_eq!(
      overlay.cell,
      CellKey::Slot {
        date: date(2024, 3, 15),
        hour: 6
      }
    );
    assert!(
      (overlay.top_percent - 50.0).abs()
        < f64::EPSILON
    );
    assert!(
      (overlay.height_percent
        - MAX_HEIGHT_PERCENT)
        .abs()
        < f64::EPSILON
    );
    assert_eq!(overlay.duration, 420);
    assert_eq!(overlay.initials, "JD");
  }

  #[test]
  fn short_shift_height_is_proportional()
  {
    let overlay = timed_overlay(&shift(
      "1",
      None,
      "A2",
      "2024-03-15 06:00",
      "2024-03-15 07:00"
    ));
    assert!(
      (overlay.height_percent - 50.0)
        .abs()
        < f64::EPSILON
    );
    assert_eq!(overlay.initials, "XX");
  }

  #[test]
  fn overnight_shift_duration_wraps() {
    let overlay = timed_overlay(&shift(
      "1",
      None,
      "B2",
      "2024-03-15 22:00",
      "2024-03-16 06:00"
    ));
    assert_eq!(overlay.duration, 480);
    assert_eq!(
      overlay.cell,
      CellKey::Slot {
        date: date(2024, 3, 15),
        hour: 22
      }
    );
  }

  #[test]
  fn shifts_outside_the_stride_are_skipped()
  {
    let state = ViewState::new(
      ViewMode::Hourly,
      date(2024, 3, 15)
    );
    let layout =
      build_grid(&state, date(2024, 3, 15));
    let shifts = vec![
      shift(
        "before",
        None,
        "G",
        "2024-03-14 10:00",
        "2024-03-14 18:00"
      ),
      shift(
        "inside",
        None,
        "G",
        "2024-03-17 10:00",
        "2024-03-17 18:00"
      ),
      shift(
        "after",
        None,
        "G",
        "2024-03-18 10:00",
        "2024-03-18 18:00"
      ),
    ];
    let placed = place_timed_shifts(
      &shifts, &state, &layout
    );
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].shift_id, "inside");
  }

  #[test]
  fn weekly_columns_before_a_midweek_anchor_stay_empty()
  {
    let state = ViewState::new(
      ViewMode::Weekly,
      date(2024, 3, 14)
    );
    let layout =
      build_grid(&state, date(2024, 3, 14));
    let monday = shift(
      "monday",
      None,
      "A3",
      "2024-03-11 06:00",
      "2024-03-11 14:00"
    );
    assert!(
      layout.has_cell(
        &timed_overlay(&monday).cell
      )
    );

    let shifts = vec![
      monday,
      shift(
        "thursday",
        None,
        "A3",
        "2024-03-14 06:00",
        "2024-03-14 14:00"
      ),
    ];
    let placed = place_timed_shifts(
      &shifts, &state, &layout
    );
    assert_eq!(
      placed
        .iter()
        .map(|overlay| overlay.shift_id.as_str())
        .collect::<Vec<_>>(),
      vec!["thursday"]
    );
    assert_eq!(
      state.visible_window().start,
      date(2024, 3, 14)
    );
  }

  #[test]
  fn monthly_days_show_three_badges_and_a_more_badge()
  {
    let shifts = (1..=5)
      .map(|n| {
        shift(
          &n.to_string(),
          Some("Sam Lee"),
          "A3",
          "2024-03-15 06:00",
          "2024-03-15 14:00"
        )
      })
      .chain(std::iter::once(shift(
        "other",
        Some("Cher"),
        "G",
        "2024-03-16 10:00",
        "2024-03-16 18:00"
      )))
      .collect::<Vec<_>>();

    let grouped = group_monthly_badges(
      &shifts,
      DEFAULT_MAX_BADGES
    );
    let busy = &grouped[&date(2024, 3, 15)];
    assert_eq!(busy.visible.len(), 3);
    assert_eq!(
      busy
        .visible
        .iter()
        .map(|badge| badge.shift_id.as_str())
        .collect::<Vec<_>>(),
      vec!["1", "2", "3"]
    );
    let more =
      busy.more.as_ref().expect("more badge");
    assert_eq!(more.label(), "+2 more");
    assert_eq!(more.opens_id, "4");

    let quiet = &grouped[&date(2024, 3, 16)];
    assert_eq!(quiet.visible.len(), 1);
    assert!(quiet.more.is_none());
    assert_eq!(quiet.visible[0].label, "Cr G");
  }

  #[test]
  fn sequencer_applies_only_the_latest_ticket()
  {
    let sequencer = FetchSequencer::new();
    let first = sequencer.begin();
    let second = sequencer.begin();
    assert!(sequencer.is_loading());

    assert!(!sequencer.settle(first));
    assert!(sequencer.is_loading());
    assert!(sequencer.settle(second));
    assert!(!sequencer.is_loading());
  }
}
