use std::fs;
use std::path::{
  Path,
  PathBuf
};

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use thiserror::Error;

use crate::datetime::{
  parse_timezone,
  today_in_timezone
};
use crate::overlay::DEFAULT_MAX_BADGES;
use crate::roster::DEFAULT_WEEKLY_HOUR_LIMIT;
use crate::shift::ShiftType;
use crate::view::ViewMode;

pub const CONFIG_FILE_NAME: &str =
  "flexy.toml";
pub const CONFIG_ENV_VAR: &str =
  "FLEXY_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error(
    "failed reading config {}: {source}",
    path.display()
  )]
  Read {
    path:   PathBuf,
    source: std::io::Error
  },

  #[error(
    "failed parsing config {}: {source}",
    path.display()
  )]
  Parse {
    path:   PathBuf,
    source: toml::de::Error
  }
}

fn default_timezone() -> String {
  "UTC".to_string()
}

fn default_view() -> String {
  ViewMode::default()
    .as_key()
    .to_string()
}

fn default_shift_type() -> String {
  ShiftType::A3.as_code().to_string()
}

fn default_max_badges() -> usize {
  DEFAULT_MAX_BADGES
}

fn default_hour_limit() -> u32 {
  DEFAULT_WEEKLY_HOUR_LIMIT
}

#[derive(
  Debug, Clone, PartialEq, Serialize, Deserialize,
)]
pub struct FlexyConfig {
  /// Prefix for `/api` paths. Empty means same origin.
  #[serde(default)]
  pub api_base:           String,
  #[serde(default = "default_timezone")]
  pub timezone:           String,
  #[serde(default = "default_view")]
  pub default_view:       String,
  #[serde(
    default = "default_shift_type"
  )]
  pub default_shift_type: String,
  #[serde(
    default = "default_max_badges"
  )]
  pub max_badges_per_day: usize,
  #[serde(
    default = "default_hour_limit"
  )]
  pub weekly_hour_limit:  u32
}

impl Default for FlexyConfig {
  fn default() -> Self {
    Self {
      api_base:           String::new(),
      timezone:           default_timezone(
      ),
      default_view:       default_view(),
      default_shift_type:
        default_shift_type(),
      max_badges_per_day:
        default_max_badges(),
      weekly_hour_limit:
        default_hour_limit()
    }
  }
}

impl FlexyConfig {
  /// Parses and sanitizes. Used for the copy embedded in the web bundle.
  pub fn from_toml_str(
    raw: &str
  ) -> Result<Self, toml::de::Error> {
    let mut config =
      toml::from_str::<Self>(raw)?;
    config.sanitize();
    Ok(config)
  }

  #[tracing::instrument]
  pub fn load(
    path: &Path
  ) -> Result<Self, ConfigError> {
    let raw = fs::read_to_string(path)
      .map_err(|source| {
        ConfigError::Read {
          path: path.to_path_buf(),
          source
        }
      })?;
    let config = Self::from_toml_str(&raw)
      .map_err(|source| {
        ConfigError::Parse {
          path: path.to_path_buf(),
          source
        }
      })?;
    tracing::info!(
      path = %path.display(),
      timezone = %config.timezone,
      default_view = %config.default_view,
      "loaded flexy config"
    );
    Ok(config)
  }

  /// Replaces out-of-range values with their defaults.
  pub fn sanitize(&mut self) {
    self.api_base = self
      .api_base
      .trim()
      .trim_end_matches('/')
      .to_string();

    if ViewMode::from_key(
      self.default_view.trim()
    )
    .is_none()
    {
      tracing::warn!(
        value = %self.default_view,
        "unknown default_view; using weekly"
      );
      self.default_view = default_view();
    }

    if ShiftType::from_code(
      &self.default_shift_type
    )
    .is_none()
    {
      tracing::warn!(
        value = %self.default_shift_type,
        "unknown default_shift_type; using A3"
      );
      self.default_shift_type =
        default_shift_type();
    }

    if self.max_badges_per_day == 0 {
      tracing::warn!(
        "max_badges_per_day must be positive"
      );
      self.max_badges_per_day =
        default_max_badges();
    }

    if self.weekly_hour_limit == 0 {
      tracing::warn!(
        "weekly_hour_limit must be positive"
      );
      self.weekly_hour_limit =
        default_hour_limit();
    }

    if parse_timezone(
      &self.timezone,
      "config.timezone"
    )
    .is_none()
    {
      self.timezone = default_timezone();
    }
  }

  pub fn view_mode(&self) -> ViewMode {
    ViewMode::from_key(
      self.default_view.trim()
    )
    .unwrap_or_default()
  }

  pub fn shift_type(&self) -> ShiftType {
    ShiftType::from_code(
      &self.default_shift_type
    )
    .unwrap_or(ShiftType::A3)
  }

  pub fn tz(&self) -> Tz {
    self
      .timezone
      .trim()
      .parse::<Tz>()
      .unwrap_or(Tz::UTC)
  }

  pub fn today(&self) -> NaiveDate {
    today_in_timezone(self.tz())
  }
}

/// First existing config file among the explicit path, `$FLEXY_CONFIG`,
/// and `<config_dir>/flexy/flexy.toml`. An explicit path is returned even
/// when missing so the caller reports it.
pub fn resolve_config_path(
  explicit: Option<&Path>,
  env_value: Option<&str>,
  config_dir: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = explicit {
    return Some(path.to_path_buf());
  }

  if let Some(raw) = env_value
    .map(str::trim)
    .filter(|raw| !raw.is_empty())
  {
    return Some(PathBuf::from(raw));
  }

  let candidate = config_dir?
    .join("flexy")
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    Some(candidate)
  } else {
    tracing::debug!(
      candidate = %candidate.display(),
      "no config file found; using defaults"
    );
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_gives_defaults() {
    let config =
      FlexyConfig::from_toml_str("")
        .expect("empty toml parses");
    assert_eq!(
      config,
      FlexyConfig::default()
    );
    assert_eq!(
      config.view_mode(),
      ViewMode::Weekly
    );
    assert_eq!(
      config.shift_type(),
      ShiftType::A3
    );
  }

  #[test]
  fn invalid_values_are_sanitized() {
    let config = FlexyConfig::from_toml_str(
      r#"
        api_base = "http://localhost:5000/"
        timezone = "Mars/Olympus"
        default_view = "yearly"
        default_shift_type = "Z9"
        max_badges_per_day = 0
        weekly_hour_limit = 0
      "#
    )
    .expect("toml parses");
    assert_eq!(
      config.api_base,
      "http://localhost:5000"
    );
    assert_eq!(config.timezone, "UTC");
    assert_eq!(config.default_view, "weekly");
    assert_eq!(
      config.default_shift_type,
      "A3"
    );
    assert_eq!(
      config.max_badges_per_day,
      3
    );
    assert_eq!(
      config.weekly_hour_limit,
      40
    );
  }

  #[test]
  fn valid_values_survive() {
    let config = FlexyConfig::from_toml_str(
      r#"
        timezone = "Europe/Amsterdam"
        default_view = "monthly"
        default_shift_type = "g"
        max_badges_per_day = 5
      "#
    )
    .expect("toml parses");
    assert_eq!(
      config.view_mode(),
      ViewMode::Monthly
    );
    assert_eq!(
      config.shift_type(),
      ShiftType::G
    );
    assert_eq!(
      config.tz(),
      chrono_tz::Europe::Amsterdam
    );
    assert_eq!(
      config.max_badges_per_day,
      5
    );
  }

  #[test]
  fn explicit_path_wins_over_env() {
    let explicit = Path::new("/tmp/a.toml");
    assert_eq!(
      resolve_config_path(
        Some(explicit),
        Some("/tmp/b.toml"),
        None
      ),
      Some(explicit.to_path_buf())
    );
    assert_eq!(
      resolve_config_path(
        None,
        Some(" /tmp/b.toml "),
        None
      ),
      Some(PathBuf::from("/tmp/b.toml"))
    );
    assert_eq!(
      resolve_config_path(
        None, Some(""), None
      ),
      None
    );
  }
}
