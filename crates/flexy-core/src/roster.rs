//! Weekly roster checks: hours per caregiver and same-day shift clashes.
//!
//! A roster is a grid of dropdowns keyed by (day, shift type), each holding
//! at most one caregiver. Totals are keyed by caregiver id so two people
//! sharing a display name never merge.

use std::collections::{
  BTreeMap,
  BTreeSet
};

use serde::{
  Deserialize,
  Serialize
};

use crate::shift::{
  Caregiver,
  ShiftType
};

pub const DEFAULT_WEEKLY_HOUR_LIMIT: u32 =
  40;

/// Column order of the roster grid.
pub const ROSTER_DAYS: [&str; 7] = [
  "Mon", "Tue", "Wed", "Thu", "Fri",
  "Sat", "Sun"
];

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
pub struct SlotKey {
  pub day:        String,
  pub shift_type: ShiftType
}

impl SlotKey {
  pub fn new(
    day: impl Into<String>,
    shift_type: ShiftType
  ) -> Self {
    Self {
      day: day.into(),
      shift_type
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaregiverHours {
  pub caregiver_id: String,
  pub name:         String,
  pub hours:        u32,
  pub over:         bool
}

#[derive(Debug, Clone, Default)]
pub struct RosterBoard {
  caregivers:  Vec<Caregiver>,
  assignments: BTreeMap<SlotKey, String>,
  conflicts:   BTreeSet<SlotKey>,
  hour_limit:  u32
}

impl RosterBoard {
  pub fn new(
    caregivers: Vec<Caregiver>,
    hour_limit: u32
  ) -> Self {
    Self {
      caregivers,
      assignments: BTreeMap::new(),
      conflicts: BTreeSet::new(),
      hour_limit
    }
  }

  pub fn hour_limit(&self) -> u32 {
    self.hour_limit
  }

  pub fn caregivers(&self) -> &[Caregiver] {
    &self.caregivers
  }

  pub fn assignment(
    &self,
    slot: &SlotKey
  ) -> Option<&str> {
    self
      .assignments
      .get(slot)
      .map(String::as_str)
  }

  pub fn conflicts(
    &self
  ) -> &BTreeSet<SlotKey> {
    &self.conflicts
  }

  pub fn is_conflicting(
    &self,
    slot: &SlotKey
  ) -> bool {
    self.conflicts.contains(slot)
  }

  /// Stores a dropdown value without re-running any checks.
  pub fn set(
    &mut self,
    slot: SlotKey,
    caregiver_id: Option<String>
  ) {
    match caregiver_id
      .filter(|id| !id.trim().is_empty())
    {
      | Some(id) => {
        self.assignments.insert(slot, id);
      }
      | None => {
        self.assignments.remove(&slot);
      }
    }
  }

  /// A dropdown changed: store it, then refresh totals and clash markers
  /// the way the page does on every change event.
  pub fn select(
    &mut self,
    slot: SlotKey,
    caregiver_id: Option<String>
  ) -> Vec<CaregiverHours> {
    self.set(slot.clone(), caregiver_id);
    self.check_overlap(&slot);
    self.recompute_hours()
  }

  /// Hour totals for every known caregiver, in roster order, followed by
  /// any assigned ids that are not on the caregiver list.
  pub fn recompute_hours(
    &self
  ) -> Vec<CaregiverHours> {
    let mut totals: BTreeMap<&str, u32> =
      BTreeMap::new();
    for (slot, caregiver_id) in
      &self.assignments
    {
      *totals
        .entry(caregiver_id.as_str())
        .or_default() +=
        slot.shift_type.definition().hours;
    }

    let known = self
      .caregivers
      .iter()
      .map(|caregiver| {
        let hours = totals
          .remove(caregiver.id.as_str())
          .unwrap_or_default();
        self.hours_entry(
          &caregiver.id,
          &caregiver.name,
          hours
        )
      })
      .collect::<Vec<_>>();

    known
      .into_iter()
      .chain(totals.into_iter().map(
        |(id, hours)| {
          self.hours_entry(id, id, hours)
        }
      ))
      .collect()
  }

  fn hours_entry(
    &self,
    id: &str,
    name: &str,
    hours: u32
  ) -> CaregiverHours {
    CaregiverHours {
      caregiver_id: id.to_string(),
      name: name.to_string(),
      hours,
      over: hours > self.hour_limit
    }
  }

  /// Clears every clash marker, then marks `slot` and each same-day slot
  /// listed in its overlap table when both hold the same caregiver.
  ///
  /// Only the changed slot's own table entry is consulted, so the check is
  /// one-directional where the table is.
  pub fn check_overlap(
    &mut self,
    slot: &SlotKey
  ) -> &BTreeSet<SlotKey> {
    self.conflicts.clear();

    let Some(caregiver) =
      self.assignments.get(slot)
    else {
      return &self.conflicts;
    };

    let clashes = slot
      .shift_type
      .definition()
      .overlapping
      .iter()
      .map(|other| {
        SlotKey::new(
          slot.day.clone(),
          *other
        )
      })
      .filter(|other| {
        self.assignments.get(other)
          == Some(caregiver)
      })
      .collect::<Vec<_>>();

    if !clashes.is_empty() {
      tracing::debug!(
        day = %slot.day,
        shift_type = %slot.shift_type,
        clashes = clashes.len(),
        "overlapping assignment"
      );
      self.conflicts.insert(slot.clone());
      self.conflicts.extend(clashes);
    }
    &self.conflicts
  }

  /// Every clash on the board, checking each assigned slot in turn.
  pub fn scan_conflicts(
    &self
  ) -> BTreeSet<SlotKey> {
    let mut found = BTreeSet::new();
    for (slot, caregiver) in
      &self.assignments
    {
      for other in slot
        .shift_type
        .definition()
        .overlapping
      {
        let other = SlotKey::new(
          slot.day.clone(),
          *other
        );
        if self.assignments.get(&other)
          == Some(caregiver)
        {
          found.insert(slot.clone());
          found.insert(other);
        }
      }
    }
    found
  }
}

/// Roster as written in a TOML file for the terminal client.
#[derive(
  Debug, Clone, Default, Deserialize,
)]
pub struct RosterSheet {
  #[serde(default)]
  pub hour_limit:  Option<u32>,
  #[serde(default)]
  pub caregivers:  Vec<Caregiver>,
  #[serde(default)]
  pub assignments: Vec<SheetAssignment>
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetAssignment {
  pub day:       String,
  pub shift:     ShiftType,
  pub caregiver: String
}

impl RosterSheet {
  pub fn into_board(
    self,
    default_limit: u32
  ) -> RosterBoard {
    let mut board = RosterBoard::new(
      self.caregivers,
      self.hour_limit.unwrap_or(
        default_limit
      )
    );
    for entry in self.assignments {
      board.set(
        SlotKey::new(
          entry.day,
          entry.shift
        ),
        Some(entry.caregiver)
      );
    }
    board
  }
}
