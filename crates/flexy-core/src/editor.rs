//! Add/edit/delete form behind the shift modal.

use std::cell::Cell;

use chrono::{
  NaiveDate,
  NaiveTime
};
use thiserror::Error;

use crate::api::{
  ApiError,
  Operation,
  ShiftApi
};
use crate::grid::BUCKET_HOURS;
use crate::shift::{
  ShiftPayload,
  ShiftRecord,
  ShiftType
};

#[derive(
  Debug, Clone, PartialEq, Eq, Error,
)]
pub enum FormError {
  #[error("Please choose a caregiver")]
  MissingCaregiver,
  #[error("Please choose a date")]
  MissingDate,
  #[error("Please choose a shift type")]
  MissingShiftType,
  #[error("Please enter a start time")]
  MissingStart,
  #[error("Please enter an end time")]
  MissingEnd
}

#[derive(Debug, Error)]
pub enum EditorError {
  #[error(transparent)]
  Form(#[from] FormError),

  #[error("{context}: {source}")]
  Api {
    operation: Operation,
    context:   &'static str,
    source:    ApiError
  }
}

impl EditorError {
  fn api(
    operation: Operation
  ) -> impl FnOnce(ApiError) -> Self {
    move |source| Self::Api {
      operation,
      context: operation.alert_context(),
      source
    }
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct ShiftForm {
  pub date:         Option<NaiveDate>,
  pub shift_type:   Option<ShiftType>,
  pub caregiver_id: String,
  pub start:        Option<NaiveTime>,
  pub end:          Option<NaiveTime>
}

impl ShiftForm {
  /// Fills start and end from the type's defaults. Both stay editable.
  pub fn apply_shift_type(
    &mut self,
    kind: ShiftType
  ) {
    let definition = kind.definition();
    self.shift_type = Some(kind);
    self.start =
      Some(definition.default_start());
    self.end =
      Some(definition.default_end());
  }

  /// Same checks the browser's native form validation performs.
  pub fn payload(
    &self
  ) -> Result<ShiftPayload, FormError> {
    let caregiver_id =
      self.caregiver_id.trim();
    if caregiver_id.is_empty() {
      return Err(
        FormError::MissingCaregiver
      );
    }
    let date = self
      .date
      .ok_or(FormError::MissingDate)?;
    let shift_type = self
      .shift_type
      .ok_or(FormError::MissingShiftType)?;
    let start = self
      .start
      .ok_or(FormError::MissingStart)?;
    let end =
      self.end.ok_or(FormError::MissingEnd)?;

    Ok(ShiftPayload {
      caregiver_id: caregiver_id
        .to_string(),
      shift_type,
      start: date.and_time(start),
      end: date.and_time(end)
    })
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub enum EditorState {
  #[default]
  Closed,
  Adding(ShiftForm),
  Editing {
    id:   String,
    form: ShiftForm
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveRequest {
  Create(ShiftPayload),
  Update {
    id:      String,
    payload: ShiftPayload
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorOutcome {
  Saved(ShiftRecord),
  Deleted(String),
  Cancelled
}

impl EditorState {
  pub fn open_for_add(
    date: NaiveDate,
    kind: ShiftType
  ) -> Self {
    let mut form = ShiftForm {
      date: Some(date),
      ..ShiftForm::default()
    };
    form.apply_shift_type(kind);
    Self::Adding(form)
  }

  /// Add form opened from an hourly/weekly cell: the clicked bucket becomes
  /// the start and the bucket after it the end.
  pub fn open_for_bucket(
    date: NaiveDate,
    hour: u32,
    kind: ShiftType
  ) -> Self {
    let mut form = ShiftForm {
      date: Some(date),
      ..ShiftForm::default()
    };
    form.shift_type = Some(kind);
    form.start =
      NaiveTime::from_hms_opt(hour, 0, 0);
    form.end = NaiveTime::from_hms_opt(
      (hour + BUCKET_HOURS) % 24,
      0,
      0
    );
    Self::Adding(form)
  }

  /// Edit form filled from the record's own datetimes.
  pub fn open_for_edit(
    record: &ShiftRecord
  ) -> Self {
    Self::Editing {
      id:   record.id.clone(),
      form: ShiftForm {
        date:         Some(
          record.start_date()
        ),
        shift_type:   record.kind(),
        caregiver_id: record
          .caregiver_id
          .clone(),
        start:        Some(
          record.start.time()
        ),
        end:          Some(
          record.end.time()
        )
      }
    }
  }

  pub fn is_open(&self) -> bool {
    !matches!(self, Self::Closed)
  }

  pub fn title(&self) -> &'static str {
    match self {
      | Self::Editing { .. } => {
        "Edit Shift"
      }
      | _ => "Add Shift"
    }
  }

  pub fn shows_delete(&self) -> bool {
    matches!(self, Self::Editing { .. })
  }

  pub fn edit_id(&self) -> Option<&str> {
    match self {
      | Self::Editing { id, .. } => {
        Some(id.as_str())
      }
      | _ => None
    }
  }

  pub fn form(&self) -> Option<&ShiftForm> {
    match self {
      | Self::Closed => None,
      | Self::Adding(form)
      | Self::Editing { form, .. } => {
        Some(form)
      }
    }
  }

  pub fn form_mut(
    &mut self
  ) -> Option<&mut ShiftForm> {
    match self {
      | Self::Closed => None,
      | Self::Adding(form)
      | Self::Editing { form, .. } => {
        Some(form)
      }
    }
  }

  pub fn change_shift_type(
    &mut self,
    kind: ShiftType
  ) {
    if let Some(form) = self.form_mut() {
      form.apply_shift_type(kind);
    }
  }

  pub fn save_request(
    &self
  ) -> Result<Option<SaveRequest>, FormError>
  {
    match self {
      | Self::Closed => Ok(None),
      | Self::Adding(form) => Ok(Some(
        SaveRequest::Create(
          form.payload()?
        )
      )),
      | Self::Editing { id, form } => {
        Ok(Some(SaveRequest::Update {
          id:      id.clone(),
          payload: form.payload()?
        }))
      }
    }
  }
}

/// Fetches a record and opens the edit form for it. On failure the editor
/// stays closed and the error carries the alert text.
#[tracing::instrument(skip(api))]
pub async fn load_for_edit<A>(
  api: &A,
  id: &str
) -> Result<EditorState, EditorError>
where
  A: ShiftApi
{
  let record = api
    .get_shift(id)
    .await
    .map_err(EditorError::api(
      Operation::LoadShift
    ))?;
  Ok(EditorState::open_for_edit(&record))
}

#[tracing::instrument(skip_all)]
pub async fn submit<A>(
  api: &A,
  state: &EditorState
) -> Result<EditorOutcome, EditorError>
where
  A: ShiftApi
{
  let Some(request) =
    state.save_request()?
  else {
    return Ok(EditorOutcome::Cancelled);
  };

  let saved = match &request {
    | SaveRequest::Create(payload) => {
      tracing::info!(
        shift_type = %payload.shift_type,
        caregiver = %payload.caregiver_id,
        "creating shift"
      );
      api.create_shift(payload).await
    }
    | SaveRequest::Update {
      id,
      payload
    } => {
      tracing::info!(
        shift_id = %id,
        shift_type = %payload.shift_type,
        "updating shift"
      );
      api.update_shift(id, payload).await
    }
  }
  .map_err(EditorError::api(
    Operation::SaveShift
  ))?;

  Ok(EditorOutcome::Saved(saved))
}

/// Deletes the record being edited. Without confirmation, or outside edit
/// mode, nothing is sent.
#[tracing::instrument(skip_all)]
pub async fn delete<A>(
  api: &A,
  state: &EditorState,
  confirmed: bool
) -> Result<EditorOutcome, EditorError>
where
  A: ShiftApi
{
  let Some(id) = state.edit_id() else {
    return Ok(EditorOutcome::Cancelled);
  };
  if !confirmed {
    tracing::debug!(
      shift_id = %id,
      "delete not confirmed"
    );
    return Ok(EditorOutcome::Cancelled);
  }

  api
    .delete_shift(id)
    .await
    .map_err(EditorError::api(
      Operation::DeleteShift
    ))?;
  tracing::info!(shift_id = %id, "deleted shift");
  Ok(EditorOutcome::Deleted(
    id.to_string()
  ))
}

/// Single-flight latch for save and delete. A second submit is refused
/// until the first one settles, whatever its outcome.
#[derive(Debug, Default)]
pub struct SubmitGuard {
  busy: Cell<bool>
}

impl SubmitGuard {
  pub fn new() -> Self {
    Self::default()
  }

  /// Claims the latch; `false` when a request is already in flight.
  pub fn try_begin(&self) -> bool {
    let claimed = !self.busy.replace(true);
    if !claimed {
      tracing::debug!(
        "ignoring submit while a request is pending"
      );
    }
    claimed
  }

  pub fn finish(&self) {
    self.busy.set(false);
  }

  pub fn is_busy(&self) -> bool {
    self.busy.get()
  }
}
