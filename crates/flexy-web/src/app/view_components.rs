use flexy_core::datetime::{
  format_clock,
  format_input_date,
  parse_clock,
  parse_input_date
};
use flexy_core::editor::EditorState;
use flexy_core::shift::{
  Caregiver,
  ShiftTemplate,
  ShiftType
};
use flexy_core::template::DEFAULT_GENERATE_COUNT;
use flexy_core::view::ViewMode;
use web_sys::{
  Event,
  HtmlInputElement,
  HtmlSelectElement,
  MouseEvent
};
use yew::{
  Callback,
  Html,
  Properties,
  TargetCast,
  classes,
  function_component,
  html,
  use_state
};

#[derive(Properties, PartialEq)]
pub(super) struct ViewSwitchProps {
  pub current_view: ViewMode,
  pub on_set_view:  Callback<String>
}

#[function_component(ViewSwitch)]
pub(super) fn view_switch(
  props: &ViewSwitchProps
) -> Html {
  html! {
      <div class="view-switch">
          {
              for ViewMode::all().into_iter().map(|view| {
                  let on_set_view = props.on_set_view.clone();
                  let is_active = props.current_view == view;
                  html! {
                      <button
                          type="button"
                          class={classes!("view-btn", is_active.then_some("active"))}
                          data-view={view.as_key()}
                          onclick={Callback::from(move |_| on_set_view.emit(view.as_key().to_string()))}
                      >
                          { view.label() }
                      </button>
                  }
              })
          }
      </div>
  }
}

#[derive(Properties, PartialEq)]
pub(super) struct NavActionsProps {
  pub label:     String,
  pub anchor:    chrono::NaiveDate,
  pub on_prev:   Callback<MouseEvent>,
  pub on_today:  Callback<MouseEvent>,
  pub on_next:   Callback<MouseEvent>,
  pub on_anchor: Callback<chrono::NaiveDate>
}

#[function_component(NavActions)]
pub(super) fn nav_actions(
  props: &NavActionsProps
) -> Html {
  let on_change = {
    let on_anchor = props.on_anchor.clone();
    Callback::from(move |event: Event| {
      let input: HtmlInputElement =
        event.target_unchecked_into();
      match parse_input_date(&input.value())
      {
        | Some(date) => on_anchor.emit(date),
        | None => tracing::debug!(
          value = %input.value(),
          "ignoring incomplete date input"
        )
      }
    })
  };

  html! {
      <div class="actions nav-actions">
          <button class="btn" onclick={props.on_prev.clone()}>{ "Previous" }</button>
          <button class="btn" onclick={props.on_today.clone()}>{ "Today" }</button>
          <button class="btn" onclick={props.on_next.clone()}>{ "Next" }</button>
          <input
              type="date"
              class="date-input"
              value={format_input_date(props.anchor)}
              onchange={on_change}
          />
          <span class="date-range">{ &props.label }</span>
      </div>
  }
}

#[derive(Properties, PartialEq)]
pub(super) struct ToolbarProps {
  pub templates:   Vec<ShiftTemplate>,
  pub on_add:      Callback<MouseEvent>,
  pub on_export:   Callback<MouseEvent>,
  pub on_audit:    Callback<MouseEvent>,
  /// (selected template id, raw months value)
  pub on_generate:
    Callback<(Option<String>, String)>
}

#[function_component(Toolbar)]
pub(super) fn toolbar(
  props: &ToolbarProps
) -> Html {
  let template = use_state(String::new);
  let months = use_state(|| {
    DEFAULT_GENERATE_COUNT.to_string()
  });

  let on_template = {
    let template = template.clone();
    Callback::from(move |event: Event| {
      let select: HtmlSelectElement =
        event.target_unchecked_into();
      template.set(select.value());
    })
  };
  let on_months = {
    let months = months.clone();
    Callback::from(move |event: Event| {
      let input: HtmlInputElement =
        event.target_unchecked_into();
      months.set(input.value());
    })
  };
  let on_generate = {
    let on_generate =
      props.on_generate.clone();
    let template = template.clone();
    let months = months.clone();
    Callback::from(move |_: MouseEvent| {
      let selected = Some(
        (*template).clone()
      )
      .filter(|id| !id.is_empty());
      on_generate
        .emit((selected, (*months).clone()));
    })
  };

  html! {
      <div class="toolbar">
          <button class="btn btn-primary" onclick={props.on_add.clone()}>{ "Add Shift" }</button>
          <div class="generate-form">
              <select class="template-select" onchange={on_template}>
                  <option value="" selected={template.is_empty()}>{ "Select template" }</option>
                  {
                      for props.templates.iter().map(|entry| html! {
                          <option value={entry.id.clone()} selected={*template == entry.id}>
                              { &entry.name }
                          </option>
                      })
                  }
              </select>
              <input
                  type="number"
                  class="months-input"
                  min="1"
                  max="12"
                  value={(*months).clone()}
                  onchange={on_months}
              />
              <button class="btn" onclick={on_generate}>{ "Generate" }</button>
          </div>
          <button class="btn" onclick={props.on_export.clone()}>{ "Export ICS" }</button>
          <button class="btn" onclick={props.on_audit.clone()}>{ "View Audit" }</button>
      </div>
  }
}

#[derive(Properties, PartialEq)]
pub(super) struct LoadingOverlayProps {
  pub visible: bool
}

#[function_component(LoadingOverlay)]
pub(super) fn loading_overlay(
  props: &LoadingOverlayProps
) -> Html {
  if !props.visible {
    return html! {};
  }
  html! {
      <div class="loading-overlay">
          <div class="spinner"></div>
          <span>{ "Loading..." }</span>
      </div>
  }
}

#[derive(Properties, PartialEq)]
pub(super) struct ShiftModalProps {
  pub editor:     EditorState,
  pub caregivers: Vec<Caregiver>,
  /// Save or delete in flight; both buttons are disabled.
  #[prop_or_default]
  pub busy:       bool,
  pub on_change:  Callback<EditorState>,
  pub on_save:    Callback<()>,
  pub on_delete:  Callback<()>,
  pub on_close:   Callback<()>
}

#[function_component(ShiftModal)]
pub(super) fn shift_modal(
  props: &ShiftModalProps
) -> Html {
  let Some(form) = props.editor.form()
  else {
    return html! {};
  };

  // Each field edits a copy of the editor state and hands it back up.
  let edit = |apply: fn(
    &mut EditorState,
    String
  )| {
    let editor = props.editor.clone();
    let on_change =
      props.on_change.clone();
    Callback::from(move |event: Event| {
      let value = event
        .target_dyn_into::<HtmlInputElement>()
        .map(|input| input.value())
        .or_else(|| {
          event
            .target_dyn_into::<HtmlSelectElement>()
            .map(|select| select.value())
        })
        .unwrap_or_default();
      let mut next = editor.clone();
      apply(&mut next, value);
      on_change.emit(next);
    })
  };

  let on_date = edit(|state, value| {
    if let Some(form) = state.form_mut() {
      form.date = parse_input_date(&value);
    }
  });
  let on_type = edit(|state, value| {
    match ShiftType::from_code(&value) {
      | Some(kind) => {
        state.change_shift_type(kind)
      }
      | None => {
        if let Some(form) = state.form_mut()
        {
          form.shift_type = None;
        }
      }
    }
  });
  let on_caregiver =
    edit(|state, value| {
      if let Some(form) = state.form_mut()
      {
        form.caregiver_id = value;
      }
    });
  let on_start = edit(|state, value| {
    if let Some(form) = state.form_mut() {
      form.start = parse_clock(&value);
    }
  });
  let on_end = edit(|state, value| {
    if let Some(form) = state.form_mut() {
      form.end = parse_clock(&value);
    }
  });

  let on_save = {
    let on_save = props.on_save.clone();
    Callback::from(move |_: MouseEvent| {
      on_save.emit(())
    })
  };
  let on_delete = {
    let on_delete =
      props.on_delete.clone();
    Callback::from(move |_: MouseEvent| {
      on_delete.emit(())
    })
  };
  let on_close = {
    let on_close = props.on_close.clone();
    Callback::from(move |_: MouseEvent| {
      on_close.emit(())
    })
  };

  let current_type = form
    .shift_type
    .map(ShiftType::as_code)
    .unwrap_or_default();

  html! {
      <div class="modal-backdrop">
          <div class="modal shift-modal">
              <div class="modal-header">
                  <h3>{ props.editor.title() }</h3>
                  <button class="btn-close" onclick={on_close.clone()}>{ "×" }</button>
              </div>
              <div class="modal-body">
                  <label>{ "Date" }</label>
                  <input
                      type="date"
                      required={true}
                      value={form.date.map(format_input_date).unwrap_or_default()}
                      onchange={on_date}
                  />
                  <label>{ "Shift type" }</label>
                  <select required={true} onchange={on_type}>
                      <option value="" selected={current_type.is_empty()}>{ "Select type" }</option>
                      {
                          for ShiftType::all().into_iter().map(|kind| html! {
                              <option value={kind.as_code()} selected={kind.as_code() == current_type}>
                                  { kind.as_code() }
                              </option>
                          })
                      }
                  </select>
                  <label>{ "Caregiver" }</label>
                  <select required={true} onchange={on_caregiver}>
                      <option value="" selected={form.caregiver_id.is_empty()}>{ "Select caregiver" }</option>
                      {
                          for props.caregivers.iter().map(|caregiver| html! {
                              <option value={caregiver.id.clone()} selected={caregiver.id == form.caregiver_id}>
                                  { &caregiver.name }
                              </option>
                          })
                      }
                  </select>
                  <label>{ "Start" }</label>
                  <input
                      type="time"
                      required={true}
                      value={form.start.map(format_clock).unwrap_or_default()}
                      onchange={on_start}
                  />
                  <label>{ "End" }</label>
                  <input
                      type="time"
                      required={true}
                      value={form.end.map(format_clock).unwrap_or_default()}
                      onchange={on_end}
                  />
              </div>
              <div class="modal-footer">
                  {
                      if props.editor.shows_delete() {
                          html! { <button class="btn btn-danger" disabled={props.busy} onclick={on_delete}>{ "Delete" }</button> }
                      } else {
                          html! {}
                      }
                  }
                  <button class="btn" onclick={on_close}>{ "Cancel" }</button>
                  <button class="btn btn-primary" disabled={props.busy} onclick={on_save}>{ "Save" }</button>
              </div>
          </div>
      </div>
  }
}
