use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;
use flexy_core::api::{
  Operation,
  ShiftApi
};
use flexy_core::config::FlexyConfig;
use flexy_core::editor::{
  self,
  EditorOutcome,
  EditorState,
  SubmitGuard
};
use flexy_core::grid::build_grid;
use flexy_core::overlay::FetchSequencer;
use flexy_core::shift::{
  Caregiver,
  ShiftRecord,
  ShiftTemplate
};
use flexy_core::template::GenerateRequest;
use flexy_core::view::{
  Direction,
  Effect,
  Transition,
  ViewState
};
use web_sys::MouseEvent;
use yew::{
  Callback,
  Html,
  Properties,
  UseStateHandle,
  function_component,
  html,
  use_effect_with,
  use_memo,
  use_mut_ref,
  use_state
};

use super::calendar_views::render_calendar_view;
use super::view_components::{
  LoadingOverlay,
  NavActions,
  ShiftModal,
  Toolbar,
  ViewSwitch
};
use super::{
  confirm,
  navigate_to,
  open_in_new_tab,
  show_alert,
  sync_view_url,
  view_from_location
};
use crate::api::GlooShiftApi;

const DELETE_PROMPT: &str =
  "Are you sure you want to delete this shift?";

#[derive(Properties, PartialEq)]
pub(super) struct CalendarPageProps {
  pub config: FlexyConfig
}

/// Handles the adapter needs to carry out a transition's effects.
///
/// `ticks` outlives renders, so a refresh requested from an old callback
/// still moves the counter past the value the fetch effect last saw.
#[derive(Clone)]
struct ViewHandles {
  view:    UseStateHandle<ViewState>,
  label:   UseStateHandle<String>,
  refresh: UseStateHandle<u64>,
  ticks:   Rc<RefCell<u64>>
}

impl ViewHandles {
  fn apply(&self, transition: Transition) {
    if transition.is_noop() {
      return;
    }
    for effect in &transition.effects {
      match effect {
        | Effect::ActivateView(mode) => {
          tracing::info!(view = %mode, "activating view");
        }
        | Effect::UpdateLabel(label) => {
          self.label.set(label.clone());
        }
        | Effect::SyncUrl(mode) => {
          sync_view_url(*mode)
        }
        | Effect::Render => self.rerender()
      }
    }
    self.view.set(transition.state);
  }

  fn rerender(&self) {
    self.refresh.set(next_tick(&self.ticks));
  }
}

#[function_component(CalendarPage)]
pub(super) fn calendar_page(
  props: &CalendarPageProps
) -> Html {
  let config = props.config.clone();
  let api = use_memo(
    config.api_base.clone(),
    |base| GlooShiftApi::new(base.clone())
  );

  let view = {
    let config = config.clone();
    use_state(move || {
      let mode = view_from_location()
        .unwrap_or_else(|| {
          config.view_mode()
        });
      ViewState::new(mode, config.today())
    })
  };
  let label = {
    let initial = view.range_label();
    use_state(move || initial)
  };
  let refresh = use_state(|| 0_u64);
  let ticks = use_mut_ref(|| 0_u64);
  let shifts =
    use_state(Vec::<ShiftRecord>::new);
  let loading = use_state(|| false);
  let saving = use_state(|| false);
  let submit_guard =
    use_mut_ref(SubmitGuard::new);
  let sequencer =
    use_mut_ref(FetchSequencer::new);
  let editor =
    use_state(EditorState::default);
  let caregivers =
    use_state(Vec::<Caregiver>::new);
  let templates =
    use_state(Vec::<ShiftTemplate>::new);

  let handles = ViewHandles {
    view:    view.clone(),
    label:   label.clone(),
    refresh: refresh.clone(),
    ticks
  };

  {
    let api = api.clone();
    let caregivers = caregivers.clone();
    let templates = templates.clone();
    use_effect_with((), move |_| {
      wasm_bindgen_futures::spawn_local(
        async move {
          match api.list_caregivers().await {
            | Ok(list) => caregivers.set(list),
            | Err(err) => tracing::error!(error = %err, "failed to load caregivers")
          }
          match api.list_templates().await {
            | Ok(list) => templates.set(list),
            | Err(err) => tracing::error!(error = %err, "failed to load templates")
          }
        }
      );
      || ()
    });
  }

  {
    let api = api.clone();
    let shifts = shifts.clone();
    let loading = loading.clone();
    let sequencer = sequencer.clone();
    use_effect_with(
      (*view, *refresh),
      move |(state, tick)| {
        let window = state.visible_window();
        let ticket =
          sequencer.borrow().begin();
        tracing::info!(
          view = %state.mode,
          start = %window.start,
          end = %window.end,
          tick,
          "fetching shifts"
        );
        shifts.set(Vec::new());
        loading.set(true);

        wasm_bindgen_futures::spawn_local(
          async move {
            let result =
              api.list_shifts(window).await;
            if !sequencer
              .borrow()
              .settle(ticket)
            {
              return;
            }
            loading.set(false);
            match result {
              | Ok(list) => {
                tracing::debug!(
                  count = list.len(),
                  "loaded shifts"
                );
                shifts.set(list);
              }
              | Err(err) => show_alert(
                &err.user_message(
                  Operation::LoadShifts
                    .alert_context()
                )
              )
            }
          }
        );
        || ()
      }
    );
  }

  let on_set_view = {
    let handles = handles.clone();
    Callback::from(move |key: String| {
      handles.apply(
        handles.view.switch_view(&key)
      )
    })
  };
  let on_prev = {
    let handles = handles.clone();
    Callback::from(move |_: MouseEvent| {
      handles.apply(
        handles
          .view
          .navigate(Direction::Previous)
      )
    })
  };
  let on_next = {
    let handles = handles.clone();
    Callback::from(move |_: MouseEvent| {
      handles.apply(
        handles.view.navigate(Direction::Next)
      )
    })
  };
  let on_today = {
    let handles = handles.clone();
    let config = config.clone();
    Callback::from(move |_: MouseEvent| {
      handles.apply(
        handles.view.go_today(config.today())
      )
    })
  };
  let on_anchor = {
    let handles = handles.clone();
    Callback::from(move |date: NaiveDate| {
      handles
        .apply(handles.view.set_anchor(date))
    })
  };

  let on_slot = {
    let editor = editor.clone();
    let kind = config.shift_type();
    Callback::from(
      move |(date, hour): (NaiveDate, u32)| {
        editor.set(
          EditorState::open_for_bucket(
            date, hour, kind
          )
        )
      }
    )
  };
  let on_day = {
    let editor = editor.clone();
    let kind = config.shift_type();
    Callback::from(move |date: NaiveDate| {
      editor.set(EditorState::open_for_add(
        date, kind
      ))
    })
  };
  let on_add = {
    let editor = editor.clone();
    let view = view.clone();
    let kind = config.shift_type();
    Callback::from(move |_: MouseEvent| {
      editor.set(EditorState::open_for_add(
        view.anchor,
        kind
      ))
    })
  };
  let on_shift = {
    let api = api.clone();
    let editor = editor.clone();
    Callback::from(move |id: String| {
      let api = api.clone();
      let editor = editor.clone();
      wasm_bindgen_futures::spawn_local(
        async move {
          match editor::load_for_edit(
            api.as_ref(),
            &id
          )
          .await
          {
            | Ok(state) => editor.set(state),
            | Err(err) => {
              show_alert(&err.to_string())
            }
          }
        }
      );
    })
  };

  let on_editor_change = {
    let editor = editor.clone();
    Callback::from(move |next: EditorState| {
      editor.set(next)
    })
  };
  let on_close = {
    let editor = editor.clone();
    Callback::from(move |_: ()| {
      editor.set(EditorState::Closed)
    })
  };
  let on_save = {
    let api = api.clone();
    let editor = editor.clone();
    let handles = handles.clone();
    let saving = saving.clone();
    let guard = submit_guard.clone();
    Callback::from(move |_: ()| {
      if !guard.borrow().try_begin() {
        return;
      }
      saving.set(true);
      let api = api.clone();
      let editor = editor.clone();
      let handles = handles.clone();
      let saving = saving.clone();
      let guard = guard.clone();
      let state = (*editor).clone();
      wasm_bindgen_futures::spawn_local(
        async move {
          let outcome = editor::submit(
            api.as_ref(),
            &state
          )
          .await;
          guard.borrow().finish();
          saving.set(false);
          finish_edit(
            outcome, &editor, &handles
          );
        }
      );
    })
  };
  let on_delete = {
    let api = api.clone();
    let editor = editor.clone();
    let handles = handles.clone();
    let saving = saving.clone();
    let guard = submit_guard.clone();
    Callback::from(move |_: ()| {
      if !guard.borrow().try_begin() {
        return;
      }
      if !confirm(DELETE_PROMPT) {
        tracing::debug!("delete not confirmed");
        guard.borrow().finish();
        return;
      }
      saving.set(true);
      let api = api.clone();
      let editor = editor.clone();
      let handles = handles.clone();
      let saving = saving.clone();
      let guard = guard.clone();
      let state = (*editor).clone();
      wasm_bindgen_futures::spawn_local(
        async move {
          let outcome = editor::delete(
            api.as_ref(),
            &state,
            true
          )
          .await;
          guard.borrow().finish();
          saving.set(false);
          finish_edit(
            outcome, &editor, &handles
          );
        }
      );
    })
  };

  let on_export = {
    let api = api.clone();
    let view = view.clone();
    Callback::from(move |_: MouseEvent| {
      let url = api
        .paths()
        .ics_download(&view.visible_window());
      tracing::info!(%url, "exporting calendar");
      open_in_new_tab(&url);
    })
  };
  let on_audit = {
    let api = api.clone();
    Callback::from(move |_: MouseEvent| {
      navigate_to(&api.paths().audit_page())
    })
  };
  let on_generate = {
    let api = api.clone();
    let view = view.clone();
    let handles = handles.clone();
    Callback::from(
      move |(template, months): (
        Option<String>,
        String
      )| {
        let request =
          match GenerateRequest::from_form(
            template.as_deref(),
            &months,
            view.anchor
          ) {
            | Ok(request) => request,
            | Err(err) => {
              show_alert(&err.to_string());
              return;
            }
          };
        let api = api.clone();
        let handles = handles.clone();
        wasm_bindgen_futures::spawn_local(
          async move {
            match api
              .apply_template(&request)
              .await
            {
              | Ok(()) => {
                tracing::info!(
                  template = %request.template_id,
                  count = request.count,
                  "applied template"
                );
                handles.rerender();
              }
              | Err(err) => show_alert(
                &err.user_message(
                  Operation::ApplyTemplate
                    .alert_context()
                )
              )
            }
          }
        );
      }
    )
  };

  let layout =
    build_grid(&view, config.today());

  html! {
      <div class="calendar-page">
          <div class="calendar-header">
              <ViewSwitch current_view={view.mode} on_set_view={on_set_view} />
              <NavActions
                  label={(*label).clone()}
                  anchor={view.anchor}
                  on_prev={on_prev}
                  on_today={on_today}
                  on_next={on_next}
                  on_anchor={on_anchor}
              />
              <Toolbar
                  templates={(*templates).clone()}
                  on_add={on_add}
                  on_export={on_export}
                  on_audit={on_audit}
                  on_generate={on_generate}
              />
          </div>
          <div class="calendar-body">
              {
                  render_calendar_view(
                      &view,
                      &layout,
                      &shifts,
                      config.max_badges_per_day,
                      on_slot,
                      on_day,
                      on_shift
                  )
              }
              <LoadingOverlay visible={*loading || *saving} />
          </div>
          <ShiftModal
              editor={(*editor).clone()}
              caregivers={(*caregivers).clone()}
              busy={*saving}
              on_change={on_editor_change}
              on_save={on_save}
              on_delete={on_delete}
              on_close={on_close}
          />
      </div>
  }
}

fn finish_edit(
  outcome: Result<
    EditorOutcome,
    editor::EditorError
  >,
  editor: &UseStateHandle<EditorState>,
  handles: &ViewHandles
) {
  match outcome {
    | Ok(EditorOutcome::Cancelled) => {}
    | Ok(EditorOutcome::Saved(record)) => {
      tracing::info!(shift_id = %record.id, "shift saved");
      editor.set(EditorState::Closed);
      handles.rerender();
    }
    | Ok(EditorOutcome::Deleted(id)) => {
      tracing::info!(shift_id = %id, "shift deleted");
      editor.set(EditorState::Closed);
      handles.rerender();
    }
    | Err(err) => show_alert(&err.to_string())
  }
}

/// Advances the shared refresh counter and returns the new value.
fn next_tick(ticks: &RefCell<u64>) -> u64 {
  let mut ticks = ticks.borrow_mut();
  *ticks = ticks.wrapping_add(1);
  *ticks
}
