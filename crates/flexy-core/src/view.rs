use std::fmt;

use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};

use crate::datetime::{
  add_days,
  format_input_date,
  format_month_year,
  format_short_date
};

pub const VIEW_QUERY_KEY: &str = "view";

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
  Hourly,
  #[default]
  Weekly,
  Monthly
}

impl ViewMode {
  pub fn all() -> [Self; 3] {
    [
      Self::Hourly,
      Self::Weekly,
      Self::Monthly
    ]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Hourly => "hourly",
      | Self::Weekly => "weekly",
      | Self::Monthly => "monthly"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::Hourly => "Hourly",
      | Self::Weekly => "Weekly",
      | Self::Monthly => "Monthly"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key {
      | "hourly" => Some(Self::Hourly),
      | "weekly" => Some(Self::Weekly),
      | "monthly" => {
        Some(Self::Monthly)
      }
      | _ => None
    }
  }

  /// Days moved by one navigation step.
  pub fn stride(self) -> i64 {
    match self {
      | Self::Hourly => 3,
      | Self::Weekly => 7,
      | Self::Monthly => 28
    }
  }

  /// Reads `view=` out of a URL query string such as `?view=monthly&x=1`.
  /// The value is percent-decoded first.
  pub fn from_query(
    query: &str
  ) -> Option<Self> {
    let raw = query
      .trim_start_matches('?')
      .split('&')
      .filter_map(|pair| {
        pair.split_once('=')
      })
      .find(|(key, _)| {
        *key == VIEW_QUERY_KEY
      })
      .map(|(_, value)| value)?;
    let raw = urlencoding::decode(raw)
      .map_or_else(
        |_| raw.to_string(),
        |value| value.into_owned()
      );

    let mode = Self::from_key(&raw);
    if mode.is_none() {
      tracing::warn!(
        view = %raw,
        "ignoring unknown view in query"
      );
    }
    mode
  }
}

impl fmt::Display for ViewMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Direction {
  Previous,
  Next
}

impl Direction {
  fn sign(self) -> i64 {
    match self {
      | Self::Previous => -1,
      | Self::Next => 1
    }
  }
}

/// Inclusive date range used for fetches and exports.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct DateWindow {
  pub start: NaiveDate,
  pub end:   NaiveDate
}

impl DateWindow {
  pub fn contains(
    &self,
    date: NaiveDate
  ) -> bool {
    self.start <= date
      && date <= self.end
  }

  pub fn start_key(&self) -> String {
    format_input_date(self.start)
  }

  pub fn end_key(&self) -> String {
    format_input_date(self.end)
  }
}

/// Work a renderer has to carry out after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
  ActivateView(ViewMode),
  UpdateLabel(String),
  SyncUrl(ViewMode),
  Render
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct ViewState {
  pub mode:   ViewMode,
  pub anchor: NaiveDate
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
  pub state:   ViewState,
  pub effects: Vec<Effect>
}

impl Transition {
  fn unchanged(state: ViewState) -> Self {
    Self {
      state,
      effects: Vec::new()
    }
  }

  pub fn is_noop(&self) -> bool {
    self.effects.is_empty()
  }
}

impl ViewState {
  pub fn new(
    mode: ViewMode,
    anchor: NaiveDate
  ) -> Self {
    Self { mode, anchor }
  }

  /// Unknown keys are logged and leave the state as it was.
  #[tracing::instrument(skip(self))]
  pub fn switch_view(
    self,
    key: &str
  ) -> Transition {
    let Some(mode) = ViewMode::from_key(
      key.trim()
    ) else {
      tracing::warn!(
        view = %key,
        "invalid view requested"
      );
      return Transition::unchanged(self);
    };

    let state = Self { mode, ..self };
    tracing::debug!(
      view = %mode,
      anchor = %state.anchor,
      "switched view"
    );
    Transition {
      state,
      effects: vec![
        Effect::ActivateView(mode),
        Effect::UpdateLabel(
          state.range_label()
        ),
        Effect::SyncUrl(mode),
        Effect::Render,
      ]
    }
  }

  pub fn navigate(
    self,
    direction: Direction
  ) -> Transition {
    let anchor = add_days(
      self.anchor,
      direction.sign()
        * self.mode.stride()
    );
    tracing::debug!(
      ?direction,
      from = %self.anchor,
      to = %anchor,
      "navigated"
    );
    self.with_anchor(anchor)
  }

  pub fn set_anchor(
    self,
    anchor: NaiveDate
  ) -> Transition {
    self.with_anchor(anchor)
  }

  pub fn go_today(
    self,
    today: NaiveDate
  ) -> Transition {
    self.with_anchor(today)
  }

  fn with_anchor(
    self,
    anchor: NaiveDate
  ) -> Transition {
    let state = Self { anchor, ..self };
    Transition {
      state,
      effects: vec![
        Effect::UpdateLabel(
          state.range_label()
        ),
        Effect::Render,
      ]
    }
  }

  pub fn visible_window(
    &self
  ) -> DateWindow {
    DateWindow {
      start: self.anchor,
      end:   add_days(
        self.anchor,
        self.mode.stride() - 1
      )
    }
  }

  /// `March 2024` for the monthly view, `Mar 15, 2024 - Mar 17, 2024`
  /// otherwise.
  pub fn range_label(&self) -> String {
    match self.mode {
      | ViewMode::Monthly => {
        format_month_year(self.anchor)
      }
      | _ => {
        let window =
          self.visible_window();
        format!(
          "{} - {}",
          format_short_date(
            window.start
          ),
          format_short_date(window.end)
        )
      }
    }
  }
}
