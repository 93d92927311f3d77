use std::cell::{Cell, RefCell};
use std::fs;

use chrono::NaiveDate;
use flexy_core::api::{ApiError, Operation, ShiftApi};
use flexy_core::config::{ConfigError, FlexyConfig};
use flexy_core::datetime::parse_shift_datetime;
use flexy_core::editor::{
    self, EditorError, EditorOutcome, EditorState, FormError, SubmitGuard,
};
use flexy_core::grid::build_grid;
use flexy_core::overlay::{FetchSequencer, group_monthly_badges, place_timed_shifts};
use flexy_core::shift::{Caregiver, ShiftPayload, ShiftRecord, ShiftTemplate, ShiftType};
use flexy_core::template::GenerateRequest;
use flexy_core::view::{DateWindow, Direction, ViewMode, ViewState};
use tempfile::tempdir;

#[derive(Default)]
struct FakeBackend {
    shifts: RefCell<Vec<ShiftRecord>>,
    next_id: Cell<u32>,
    fail_with: RefCell<Option<String>>,
    applied: RefCell<Vec<(String, u32)>>,
}

impl FakeBackend {
    fn seeded(shifts: Vec<ShiftRecord>) -> Self {
        let backend = Self::default();
        backend.next_id.set(shifts.len() as u32);
        *backend.shifts.borrow_mut() = shifts;
        backend
    }

    fn fail(&self, message: &str) {
        *self.fail_with.borrow_mut() = Some(message.to_string());
    }

    fn check(&self, operation: Operation) -> Result<(), ApiError> {
        match self.fail_with.borrow().as_deref() {
            Some(message) => Err(ApiError::from_status(
                400,
                &format!(r#"{{"error": "{message}"}}"#),
                operation.failure(),
            )),
            None => Ok(()),
        }
    }

    fn record(&self, id: String, payload: &ShiftPayload) -> ShiftRecord {
        ShiftRecord {
            id,
            caregiver_id: payload.caregiver_id.clone(),
            caregiver_name: Some("Jane Doe".to_string()),
            shift_type: payload.shift_type.to_string(),
            start: payload.start,
            end: payload.end,
            color: None,
        }
    }
}

impl ShiftApi for FakeBackend {
    async fn list_shifts(&self, window: DateWindow) -> Result<Vec<ShiftRecord>, ApiError> {
        self.check(Operation::LoadShifts)?;
        Ok(self
            .shifts
            .borrow()
            .iter()
            .filter(|shift| window.contains(shift.start_date()))
            .cloned()
            .collect())
    }

    async fn get_shift(&self, id: &str) -> Result<ShiftRecord, ApiError> {
        self.check(Operation::LoadShift)?;
        self.shifts
            .borrow()
            .iter()
            .find(|shift| shift.id == id)
            .cloned()
            .ok_or_else(|| ApiError::from_status(404, r#"{"error": "Shift not found"}"#, "x"))
    }

    async fn create_shift(&self, payload: &ShiftPayload) -> Result<ShiftRecord, ApiError> {
        self.check(Operation::SaveShift)?;
        // Stay pending for one poll, like a real round trip.
        tokio::task::yield_now().await;
        let next = self.next_id.get() + 1;
        self.next_id.set(next);
        let record = self.record(next.to_string(), payload);
        self.shifts.borrow_mut().push(record.clone());
        Ok(record)
    }

    async fn update_shift(
        &self,
        id: &str,
        payload: &ShiftPayload,
    ) -> Result<ShiftRecord, ApiError> {
        self.check(Operation::SaveShift)?;
        let record = self.record(id.to_string(), payload);
        let mut shifts = self.shifts.borrow_mut();
        let slot = shifts
            .iter_mut()
            .find(|shift| shift.id == id)
            .ok_or_else(|| ApiError::from_status(404, "", Operation::SaveShift.failure()))?;
        *slot = record.clone();
        Ok(record)
    }

    async fn delete_shift(&self, id: &str) -> Result<(), ApiError> {
        self.check(Operation::DeleteShift)?;
        self.shifts.borrow_mut().retain(|shift| shift.id != id);
        Ok(())
    }

    async fn list_caregivers(&self) -> Result<Vec<Caregiver>, ApiError> {
        self.check(Operation::LoadCaregivers)?;
        Ok(vec![Caregiver {
            id: "1".to_string(),
            name: "Jane Doe".to_string(),
            color: None,
        }])
    }

    async fn list_templates(&self) -> Result<Vec<ShiftTemplate>, ApiError> {
        self.check(Operation::LoadTemplates)?;
        Ok(vec![ShiftTemplate {
            id: "4".to_string(),
            name: "Standard week".to_string(),
        }])
    }

    async fn apply_template(&self, request: &GenerateRequest) -> Result<(), ApiError> {
        self.check(Operation::ApplyTemplate)?;
        self.applied
            .borrow_mut()
            .push((request.template_id.clone(), request.count));
        Ok(())
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn shift(id: &str, kind: &str, start: &str, end: &str) -> ShiftRecord {
    ShiftRecord {
        id: id.to_string(),
        caregiver_id: "1".to_string(),
        caregiver_name: Some("Jane Doe".to_string()),
        shift_type: kind.to_string(),
        start: parse_shift_datetime(start).expect("valid start"),
        end: parse_shift_datetime(end).expect("valid end"),
        color: Some("#ff0000".to_string()),
    }
}

#[tokio::test]
async fn hourly_render_places_only_shifts_in_window() {
    let backend = FakeBackend::seeded(vec![
        shift("1", "A3", "2024-03-15 07:00", "2024-03-15 14:00"),
        shift("2", "B2", "2024-03-16 22:00", "2024-03-17 06:00"),
        shift("3", "G", "2024-03-20 10:00", "2024-03-20 18:00"),
    ]);
    let state = ViewState::new(ViewMode::Hourly, date(2024, 3, 15));
    let sequencer = FetchSequencer::new();

    let ticket = sequencer.begin();
    let shifts = backend
        .list_shifts(state.visible_window())
        .await
        .expect("fetch succeeds");
    assert!(sequencer.settle(ticket));

    let layout = build_grid(&state, date(2024, 3, 15));
    let placed = place_timed_shifts(&shifts, &state, &layout);
    let ids: Vec<_> = placed.iter().map(|overlay| overlay.shift_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(placed[1].duration, 480);
}

#[tokio::test]
async fn stale_fetch_is_dropped_after_navigation() {
    let backend = FakeBackend::seeded(vec![shift(
        "1",
        "A3",
        "2024-03-15 06:00",
        "2024-03-15 14:00",
    )]);
    let sequencer = FetchSequencer::new();
    let state = ViewState::new(ViewMode::Weekly, date(2024, 3, 15));

    let first = sequencer.begin();
    let next = state.navigate(Direction::Next).state;
    let second = sequencer.begin();

    let _ = backend.list_shifts(state.visible_window()).await;
    assert!(!sequencer.settle(first));
    assert!(sequencer.is_loading());

    let latest = backend
        .list_shifts(next.visible_window())
        .await
        .expect("fetch succeeds");
    assert!(sequencer.settle(second));
    assert!(latest.is_empty());
    assert!(!sequencer.is_loading());
}

#[tokio::test]
async fn add_then_edit_then_delete() {
    let backend = FakeBackend::default();

    let mut state = EditorState::open_for_add(date(2024, 3, 15), ShiftType::A3);
    state.form_mut().expect("open").caregiver_id = "1".to_string();
    let EditorOutcome::Saved(created) = editor::submit(&backend, &state).await.expect("saved")
    else {
        panic!("expected a saved record");
    };
    assert_eq!(created.label(), "JD A3");

    let mut editing = editor::load_for_edit(&backend, &created.id)
        .await
        .expect("record loads");
    editing.change_shift_type(ShiftType::G);
    let EditorOutcome::Saved(updated) = editor::submit(&backend, &editing).await.expect("saved")
    else {
        panic!("expected an updated record");
    };
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.shift_type, "G");

    let unconfirmed = editor::delete(&backend, &editing, false).await.expect("no-op");
    assert_eq!(unconfirmed, EditorOutcome::Cancelled);
    assert_eq!(backend.shifts.borrow().len(), 1);

    let deleted = editor::delete(&backend, &editing, true).await.expect("deleted");
    assert_eq!(deleted, EditorOutcome::Deleted(created.id.clone()));
    assert!(backend.shifts.borrow().is_empty());
}

async fn guarded_submit(
    guard: &SubmitGuard,
    backend: &FakeBackend,
    state: &EditorState,
) -> Option<Result<EditorOutcome, EditorError>> {
    if !guard.try_begin() {
        return None;
    }
    let outcome = editor::submit(backend, state).await;
    guard.finish();
    Some(outcome)
}

#[tokio::test]
async fn double_save_creates_one_shift() {
    let backend = FakeBackend::default();
    let guard = SubmitGuard::new();
    let mut state = EditorState::open_for_add(date(2024, 3, 15), ShiftType::A3);
    state.form_mut().expect("open").caregiver_id = "1".to_string();

    let (first, second) = tokio::join!(
        guarded_submit(&guard, &backend, &state),
        guarded_submit(&guard, &backend, &state),
    );
    assert!(matches!(first, Some(Ok(EditorOutcome::Saved(_)))));
    assert!(second.is_none());
    assert_eq!(backend.shifts.borrow().len(), 1);
    assert!(!guard.is_busy());

    backend.fail("Caregiver not found");
    let failed = guarded_submit(&guard, &backend, &state).await;
    assert!(matches!(failed, Some(Err(_))));
    assert!(!guard.is_busy());
}

#[tokio::test]
async fn invalid_form_never_reaches_the_backend() {
    let backend = FakeBackend::default();
    let state = EditorState::open_for_add(date(2024, 3, 15), ShiftType::A3);
    let error = editor::submit(&backend, &state).await.expect_err("rejected");
    assert!(matches!(error, EditorError::Form(FormError::MissingCaregiver)));
    assert!(backend.shifts.borrow().is_empty());
}

#[tokio::test]
async fn server_errors_carry_alert_text() {
    let backend = FakeBackend::seeded(vec![shift(
        "1",
        "A3",
        "2024-03-15 06:00",
        "2024-03-15 14:00",
    )]);
    backend.fail("Caregiver not found");

    let mut state = EditorState::open_for_add(date(2024, 3, 15), ShiftType::A3);
    state.form_mut().expect("open").caregiver_id = "7".to_string();
    let error = editor::submit(&backend, &state).await.expect_err("fails");
    assert_eq!(error.to_string(), "Failed to save shift: Caregiver not found");

    let error = editor::load_for_edit(&backend, "1").await.expect_err("fails");
    assert_eq!(
        error.to_string(),
        "Failed to load shift details: Caregiver not found"
    );
}

#[tokio::test]
async fn monthly_fetch_groups_badges() {
    let shifts = (1..=4)
        .map(|n| shift(&n.to_string(), "A3", "2024-03-04 06:00", "2024-03-04 14:00"))
        .collect();
    let backend = FakeBackend::seeded(shifts);
    let state = ViewState::new(ViewMode::Monthly, date(2024, 3, 1));
    let fetched = backend
        .list_shifts(state.visible_window())
        .await
        .expect("fetch succeeds");
    let grouped = group_monthly_badges(&fetched, 3);
    let day = &grouped[&date(2024, 3, 4)];
    assert_eq!(day.visible.len(), 3);
    assert_eq!(day.visible[0].color, "#ff0000");
    assert_eq!(day.more.as_ref().map(|more| more.label()), Some("+1 more".to_string()));
}

#[tokio::test]
async fn template_generation_sends_count() {
    let backend = FakeBackend::default();
    let request = GenerateRequest::from_form(Some("4"), "", date(2024, 3, 4)).expect("valid");
    backend.apply_template(&request).await.expect("applied");
    assert_eq!(*backend.applied.borrow(), vec![("4".to_string(), 3)]);
}

#[test]
fn config_file_loads_and_sanitizes() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("flexy.toml");
    fs::write(
        &path,
        "api_base = \"http://localhost:5000/\"\ndefault_view = \"hourly\"\nmax_badges_per_day = 0\n",
    )
    .expect("write config");

    let config = FlexyConfig::load(&path).expect("config loads");
    assert_eq!(config.api_base, "http://localhost:5000");
    assert_eq!(config.view_mode(), ViewMode::Hourly);
    assert_eq!(config.max_badges_per_day, 3);
}

#[test]
fn config_errors_name_the_file() {
    let temp = tempdir().expect("tempdir");
    let missing = temp.path().join("missing.toml");
    assert!(matches!(
        FlexyConfig::load(&missing),
        Err(ConfigError::Read { .. })
    ));

    let broken = temp.path().join("broken.toml");
    fs::write(&broken, "default_view = [").expect("write config");
    let error = FlexyConfig::load(&broken).expect_err("parse fails");
    assert!(error.to_string().contains("broken.toml"));
}
