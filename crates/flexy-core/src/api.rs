//! Contract with the shift backend: endpoint paths, payloads, the error
//! body, and the [`ShiftApi`] trait the browser and terminal clients
//! implement.

use serde::{
  Deserialize,
  Serialize
};
use thiserror::Error;

use crate::shift::{
  Caregiver,
  ShiftPayload,
  ShiftRecord,
  ShiftTemplate
};
use crate::template::GenerateRequest;
use crate::view::DateWindow;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("request failed: {0}")]
  Transport(String),

  #[error("{message}")]
  Status { status: u16, message: String },

  #[error("unexpected response: {0}")]
  Decode(String)
}

impl ApiError {
  /// Builds the error for a non-2xx response, preferring the server's
  /// `{"error": ...}` text over `fallback`.
  pub fn from_status(
    status: u16,
    body: &str,
    fallback: &str
  ) -> Self {
    let message =
      serde_json::from_str::<ErrorBody>(
        body
      )
      .ok()
      .and_then(|parsed| parsed.error)
      .filter(|message| {
        !message.trim().is_empty()
      })
      .unwrap_or_else(|| {
        fallback.to_string()
      });
    Self::Status { status, message }
  }

  /// Text for a blocking alert, e.g. `Failed to save shift: Caregiver not
  /// found`.
  pub fn user_message(
    &self,
    context: &str
  ) -> String {
    format!("{context}: {self}")
  }
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct ErrorBody {
  #[serde(default)]
  pub error: Option<String>
}

/// What a call was trying to do; used for fallback messages and alerts.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Operation {
  LoadShifts,
  LoadShift,
  SaveShift,
  DeleteShift,
  LoadCaregivers,
  LoadTemplates,
  ApplyTemplate,
  ExportIcs
}

impl Operation {
  pub fn failure(self) -> &'static str {
    match self {
      | Self::LoadShifts => {
        "Failed to load shifts"
      }
      | Self::LoadShift => {
        "Failed to load shift"
      }
      | Self::SaveShift => {
        "Failed to save shift"
      }
      | Self::DeleteShift => {
        "Failed to delete shift"
      }
      | Self::LoadCaregivers => {
        "Failed to load caregivers"
      }
      | Self::LoadTemplates => {
        "Failed to load templates"
      }
      | Self::ApplyTemplate => {
        "Failed to generate calendar"
      }
      | Self::ExportIcs => {
        "Failed to export calendar"
      }
    }
  }

  /// Prefix used in alerts; differs from [`Operation::failure`] only for
  /// the detail fetch, which the editor reports as "shift details".
  pub fn alert_context(
    self
  ) -> &'static str {
    match self {
      | Self::LoadShift => {
        "Failed to load shift details"
      }
      | other => other.failure()
    }
  }
}

/// Endpoint builder rooted at an optional base URL. An empty base keeps
/// paths relative to the page origin.
#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct ApiPaths {
  base: String
}

impl ApiPaths {
  pub fn new(
    base: impl Into<String>
  ) -> Self {
    let base = base.into();
    Self {
      base: base
        .trim()
        .trim_end_matches('/')
        .to_string()
    }
  }

  pub fn base(&self) -> &str {
    &self.base
  }

  fn join(&self, path: &str) -> String {
    format!("{}{}", self.base, path)
  }

  pub fn shifts(&self) -> String {
    self.join("/api/shifts")
  }

  pub fn shifts_in(
    &self,
    window: &DateWindow
  ) -> String {
    format!(
      "{}?start={}&end={}",
      self.shifts(),
      window.start_key(),
      window.end_key()
    )
  }

  pub fn shift(&self, id: &str) -> String {
    format!(
      "{}/{}",
      self.shifts(),
      urlencoding::encode(id)
    )
  }

  pub fn ics_download(
    &self,
    window: &DateWindow
  ) -> String {
    format!(
      "{}/download-ics?start={}&end={}",
      self.shifts(),
      window.start_key(),
      window.end_key()
    )
  }

  pub fn caregivers(&self) -> String {
    self.join("/api/caregivers")
  }

  pub fn templates(&self) -> String {
    self.join("/api/templates")
  }

  pub fn apply_template(
    &self,
    template_id: &str
  ) -> String {
    format!(
      "{}/{}/apply",
      self.templates(),
      urlencoding::encode(template_id)
    )
  }

  pub fn audit_page(&self) -> String {
    self.join("/audit")
  }
}

/// Calls the calendar makes against the backend.
///
/// Implemented over `gloo` in the browser and `reqwest` in the terminal
/// client. Futures are not required to be `Send`, so the browser
/// implementation can hold JS handles across awaits.
#[allow(async_fn_in_trait)]
pub trait ShiftApi {
  async fn list_shifts(
    &self,
    window: DateWindow
  ) -> Result<Vec<ShiftRecord>, ApiError>;

  async fn get_shift(
    &self,
    id: &str
  ) -> Result<ShiftRecord, ApiError>;

  async fn create_shift(
    &self,
    payload: &ShiftPayload
  ) -> Result<ShiftRecord, ApiError>;

  async fn update_shift(
    &self,
    id: &str,
    payload: &ShiftPayload
  ) -> Result<ShiftRecord, ApiError>;

  async fn delete_shift(
    &self,
    id: &str
  ) -> Result<(), ApiError>;

  async fn list_caregivers(
    &self
  ) -> Result<Vec<Caregiver>, ApiError>;

  async fn list_templates(
    &self
  ) -> Result<Vec<ShiftTemplate>, ApiError>;

  async fn apply_template(
    &self,
    request: &GenerateRequest
  ) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  #[test]
  fn status_error_prefers_server_text() {
    let error = ApiError::from_status(
      400,
      r#"{"error": "Invalid shift type: Z"}"#,
      Operation::SaveShift.failure()
    );
    assert_eq!(
      error.user_message(
        Operation::SaveShift
          .alert_context()
      ),
      "Failed to save shift: Invalid \
       shift type: Z"
    );
  }

  #[test]
  fn status_error_falls_back_on_bad_body()
  {
    for body in ["", "<html>", r#"{"error": ""}"#]
    {
      let error = ApiError::from_status(
        500,
        body,
        Operation::LoadShifts.failure()
      );
      assert_eq!(
        error.to_string(),
        "Failed to load shifts"
      );
    }
  }

  #[test]
  fn export_failure_names_the_export() {
    let error = ApiError::from_status(
      502,
      "",
      Operation::ExportIcs.failure()
    );
    assert_eq!(
      error.to_string(),
      "Failed to export calendar"
    );
    assert_eq!(
      Operation::ExportIcs.alert_context(),
      "Failed to export calendar"
    );
  }

  #[test]
  fn paths_join_base_and_window() {
    let paths = ApiPaths::new(
      "http://localhost:5000/"
    );
    let window = DateWindow {
      start: NaiveDate::from_ymd_opt(
        2024, 3, 15
      )
      .expect("valid date"),
      end:   NaiveDate::from_ymd_opt(
        2024, 3, 21
      )
      .expect("valid date")
    };
    assert_eq!(
      paths.shifts_in(&window),
      "http://localhost:5000/api/shifts?start=2024-03-15&end=2024-03-21"
    );
    assert_eq!(
      paths.ics_download(&window),
      "http://localhost:5000/api/shifts/download-ics?start=2024-03-15&end=2024-03-21"
    );
    assert_eq!(
      ApiPaths::default().shift("a/b c"),
      "/api/shifts/a%2Fb%20c"
    );
    assert_eq!(
      ApiPaths::default()
        .apply_template("4"),
      "/api/templates/4/apply"
    );
  }
}
