use std::fmt;
use std::str::FromStr;

use chrono::{
  NaiveDate,
  NaiveDateTime,
  NaiveTime
};
use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer
};

use crate::datetime::{
  format_shift_datetime,
  parse_shift_datetime
};

pub const DEFAULT_SHIFT_COLOR: &str =
  "#3788d8";
const MISSING_INITIALS: &str = "XX";

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
pub enum ShiftType {
  A1,
  A2,
  A3,
  G,
  B1,
  B2,
  B3
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftTypeDefinition {
  pub kind:        ShiftType,
  start:           (u32, u32),
  end:             (u32, u32),
  pub hours:       u32,
  pub overlapping: &'static [ShiftType]
}

static DEFINITIONS: [ShiftTypeDefinition;
  7] = [
  ShiftTypeDefinition {
    kind:        ShiftType::A1,
    start:       (0, 1),
    end:         (8, 0),
    hours:       8,
    overlapping: &[
      ShiftType::A2,
      ShiftType::A3
    ]
  },
  ShiftTypeDefinition {
    kind:        ShiftType::A2,
    start:       (6, 0),
    end:         (10, 0),
    hours:       4,
    overlapping: &[
      ShiftType::A1,
      ShiftType::A3,
      ShiftType::G
    ]
  },
  ShiftTypeDefinition {
    kind:        ShiftType::A3,
    start:       (6, 0),
    end:         (14, 0),
    hours:       8,
    overlapping: &[
      ShiftType::A1,
      ShiftType::A2,
      ShiftType::G,
      ShiftType::B1
    ]
  },
  ShiftTypeDefinition {
    kind:        ShiftType::G,
    start:       (10, 0),
    end:         (18, 0),
    hours:       8,
    overlapping: &[
      ShiftType::A2,
      ShiftType::A3,
      ShiftType::B1
    ]
  },
  ShiftTypeDefinition {
    kind:        ShiftType::B1,
    start:       (14, 0),
    end:         (22, 0),
    hours:       8,
    overlapping: &[
      ShiftType::A3,
      ShiftType::G,
      ShiftType::B2
    ]
  },
  ShiftTypeDefinition {
    kind:        ShiftType::B2,
    start:       (16, 0),
    end:         (23, 59),
    hours:       8,
    overlapping: &[
      ShiftType::B1,
      ShiftType::B3
    ]
  },
  ShiftTypeDefinition {
    kind:        ShiftType::B3,
    start:       (18, 0),
    end:         (22, 0),
    hours:       8,
    overlapping: &[ShiftType::B2]
  }
];

impl ShiftType {
  pub fn all() -> [Self; 7] {
    [
      Self::A1,
      Self::A2,
      Self::A3,
      Self::G,
      Self::B1,
      Self::B2,
      Self::B3
    ]
  }

  pub fn as_code(self) -> &'static str {
    match self {
      | Self::A1 => "A1",
      | Self::A2 => "A2",
      | Self::A3 => "A3",
      | Self::G => "G",
      | Self::B1 => "B1",
      | Self::B2 => "B2",
      | Self::B3 => "B3"
    }
  }

  pub fn from_code(
    code: &str
  ) -> Option<Self> {
    Self::all().into_iter().find(
      |kind| {
        kind
          .as_code()
          .eq_ignore_ascii_case(
            code.trim()
          )
      }
    )
  }

  pub fn definition(
    self
  ) -> &'static ShiftTypeDefinition {
    &DEFINITIONS[self as usize]
  }
}

impl fmt::Display for ShiftType {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_code())
  }
}

impl FromStr for ShiftType {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::from_code(s).ok_or_else(|| {
      format!("unknown shift type: {s}")
    })
  }
}

impl ShiftTypeDefinition {
  pub fn default_start(
    &self
  ) -> NaiveTime {
    clock(self.start)
  }

  pub fn default_end(&self) -> NaiveTime {
    clock(self.end)
  }

  pub fn overlaps_with(
    &self,
    other: ShiftType
  ) -> bool {
    self.overlapping.contains(&other)
  }
}

fn clock(
  (hour, minute): (u32, u32)
) -> NaiveTime {
  NaiveTime::from_hms_opt(
    hour, minute, 0
  )
  .unwrap_or(NaiveTime::MIN)
}

/// A shift as the backend returns it. Ids arrive as strings or numbers
/// depending on how the record was stored; both are kept as strings.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct ShiftRecord {
  #[serde(deserialize_with = "id_string")]
  pub id:             String,
  #[serde(deserialize_with = "id_string")]
  pub caregiver_id:   String,
  #[serde(default)]
  pub caregiver_name: Option<String>,
  pub shift_type:     String,
  #[serde(with = "shift_datetime")]
  pub start:          NaiveDateTime,
  #[serde(with = "shift_datetime")]
  pub end:            NaiveDateTime,
  #[serde(default)]
  pub color:          Option<String>
}

impl ShiftRecord {
  pub fn kind(&self) -> Option<ShiftType> {
    ShiftType::from_code(
      &self.shift_type
    )
  }

  pub fn start_date(&self) -> NaiveDate {
    self.start.date()
  }

  pub fn color_or_default(&self) -> &str {
    self
      .color
      .as_deref()
      .filter(|color| {
        !color.trim().is_empty()
      })
      .unwrap_or(DEFAULT_SHIFT_COLOR)
  }

  pub fn initials(&self) -> String {
    caregiver_initials(
      self.caregiver_name.as_deref()
    )
  }

  /// `JD A3`
  pub fn label(&self) -> String {
    format!(
      "{} {}",
      self.initials(),
      self.shift_type
    )
  }
}

/// First letters of the first and last name tokens; a lone token of two or
/// more characters gives its first and last character.
pub fn caregiver_initials(
  name: Option<&str>
) -> String {
  let tokens = name
    .unwrap_or_default()
    .split_whitespace()
    .collect::<Vec<_>>();

  match tokens.as_slice() {
    | [] => MISSING_INITIALS.to_string(),
    | [single] => {
      let mut chars = single.chars();
      match (chars.next(), chars.last())
      {
        | (Some(first), Some(last)) => {
          format!("{first}{last}")
        }
        | _ => {
          MISSING_INITIALS.to_string()
        }
      }
    }
    | [first, .., last] => {
      let first =
        first.chars().next();
      let last = last.chars().next();
      match (first, last) {
        | (Some(a), Some(b)) => {
          format!("{a}{b}")
        }
        | _ => {
          MISSING_INITIALS.to_string()
        }
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct Caregiver {
  #[serde(deserialize_with = "id_string")]
  pub id:    String,
  pub name:  String,
  #[serde(default)]
  pub color: Option<String>
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct ShiftTemplate {
  #[serde(deserialize_with = "id_string")]
  pub id:   String,
  pub name: String
}

/// Body for `POST /api/shifts` and `PUT /api/shifts/{id}`.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct ShiftPayload {
  pub caregiver_id: String,
  pub shift_type:   ShiftType,
  #[serde(with = "shift_datetime")]
  pub start:        NaiveDateTime,
  #[serde(with = "shift_datetime")]
  pub end:          NaiveDateTime
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
  Text(String),
  Number(i64)
}

fn id_string<'de, D>(
  deserializer: D
) -> Result<String, D::Error>
where
  D: Deserializer<'de>
{
  Ok(
    match RawId::deserialize(
      deserializer
    )? {
      | RawId::Text(text) => text,
      | RawId::Number(number) => {
        number.to_string()
      }
    }
  )
}

mod shift_datetime {
  use super::*;

  pub fn serialize<S>(
    value: &NaiveDateTime,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &format_shift_datetime(*value)
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDateTime, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw =
      String::deserialize(deserializer)?;
    parse_shift_datetime(&raw).ok_or_else(
      || {
        serde::de::Error::custom(
          format!(
            "invalid shift datetime: \
             {raw}"
          )
        )
      }
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn initials_follow_name_shape() {
    assert_eq!(
      caregiver_initials(Some(
        "Jane Doe"
      )),
      "JD"
    );
    assert_eq!(
      caregiver_initials(Some(
        "Mary Ann Smith"
      )),
      "MS"
    );
    assert_eq!(
      caregiver_initials(Some("Cher")),
      "Cr"
    );
    assert_eq!(
      caregiver_initials(Some("")),
      "XX"
    );
    assert_eq!(
      caregiver_initials(None),
      "XX"
    );
    assert_eq!(
      caregiver_initials(Some("Q")),
      "XX"
    );
  }

  #[test]
  fn definitions_line_up_with_kinds() {
    for kind in ShiftType::all() {
      assert_eq!(
        kind.definition().kind,
        kind
      );
    }
    let a1 = ShiftType::A1.definition();
    assert_eq!(
      a1.default_start(),
      NaiveTime::from_hms_opt(0, 1, 0)
        .expect("valid time")
    );
    assert_eq!(
      ShiftType::A2.definition().hours,
      4
    );
  }

  #[test]
  fn adjacency_is_kept_one_directional()
  {
    assert!(
      ShiftType::A3
        .definition()
        .overlaps_with(ShiftType::B1)
    );
    assert!(
      !ShiftType::G
        .definition()
        .overlaps_with(ShiftType::A1)
    );
  }

  #[test]
  fn record_accepts_numeric_ids_and_missing_color()
  {
    let raw = r#"{
      "id": 12,
      "caregiver_id": "3",
      "caregiver_name": "Jane Doe",
      "shift_type": "B2",
      "start": "2024-03-15 16:00",
      "end": "2024-03-15 23:59"
    }"#;
    let record: ShiftRecord =
      serde_json::from_str(raw)
        .expect("record parses");
    assert_eq!(record.id, "12");
    assert_eq!(
      record.kind(),
      Some(ShiftType::B2)
    );
    assert_eq!(
      record.color_or_default(),
      DEFAULT_SHIFT_COLOR
    );
    assert_eq!(record.label(), "JD B2");
  }

  #[test]
  fn payload_serializes_space_separated_datetimes()
  {
    let day =
      NaiveDate::from_ymd_opt(2024, 3, 15)
        .expect("valid date");
    let payload = ShiftPayload {
      caregiver_id: "7".to_string(),
      shift_type:   ShiftType::G,
      start:        day
        .and_hms_opt(10, 0, 0)
        .expect("valid datetime"),
      end:          day
        .and_hms_opt(18, 0, 0)
        .expect("valid datetime")
    };
    let value =
      serde_json::to_value(&payload)
        .expect("payload serializes");
    assert_eq!(
      value["start"],
      "2024-03-15 10:00"
    );
    assert_eq!(value["shift_type"], "G");
  }
}
