use flexy_core::api::{
  Operation,
  ShiftApi
};
use flexy_core::config::FlexyConfig;
use flexy_core::roster::{
  CaregiverHours,
  ROSTER_DAYS,
  RosterBoard,
  SlotKey
};
use flexy_core::shift::ShiftType;
use web_sys::{
  Event,
  HtmlSelectElement
};
use yew::{
  Callback,
  Html,
  Properties,
  TargetCast,
  UseStateHandle,
  classes,
  function_component,
  html,
  use_effect_with,
  use_state
};

use super::show_alert;
use crate::api::GlooShiftApi;

#[derive(Properties, PartialEq)]
pub(super) struct RosterPageProps {
  pub config: FlexyConfig
}

#[function_component(RosterPage)]
pub(super) fn roster_page(
  props: &RosterPageProps
) -> Html {
  let limit = props.config.weekly_hour_limit;
  let board = use_state(|| {
    RosterBoard::new(Vec::new(), limit)
  });
  let hours = use_state(Vec::<CaregiverHours>::new);

  {
    let board = board.clone();
    let hours = hours.clone();
    let api =
      GlooShiftApi::new(props.config.api_base.clone());
    use_effect_with((), move |_| {
      wasm_bindgen_futures::spawn_local(
        async move {
          match api.list_caregivers().await {
            | Ok(caregivers) => {
              tracing::info!(
                count = caregivers.len(),
                "loaded roster caregivers"
              );
              let fresh = RosterBoard::new(
                caregivers, limit
              );
              hours.set(fresh.recompute_hours());
              board.set(fresh);
            }
            | Err(err) => show_alert(
              &err.user_message(
                Operation::LoadCaregivers
                  .alert_context()
              )
            )
          }
        }
      );
      || ()
    });
  }

  html! {
      <div class="roster-page">
          <h2>{ "Weekly roster" }</h2>
          <table class="roster-grid">
              <thead>
                  <tr>
                      <th>{ "Shift" }</th>
                      { for ROSTER_DAYS.iter().map(|day| html! { <th>{ *day }</th> }) }
                  </tr>
              </thead>
              <tbody>
                  {
                      for ShiftType::all().into_iter().map(|kind| html! {
                          <tr>
                              <td class="shift-code">{ kind.as_code() }</td>
                              {
                                  for ROSTER_DAYS.iter().map(|day| {
                                      render_slot(SlotKey::new(*day, kind), &board, &hours)
                                  })
                              }
                          </tr>
                      })
                  }
              </tbody>
          </table>
          { render_hours(&hours, board.hour_limit()) }
      </div>
  }
}

fn render_slot(
  slot: SlotKey,
  board: &UseStateHandle<RosterBoard>,
  hours: &UseStateHandle<Vec<CaregiverHours>>
) -> Html {
  let current = board
    .assignment(&slot)
    .unwrap_or_default()
    .to_string();
  let conflicting = board.is_conflicting(&slot);

  let on_change = {
    let board = board.clone();
    let hours = hours.clone();
    let slot = slot.clone();
    Callback::from(move |event: Event| {
      let select: HtmlSelectElement =
        event.target_unchecked_into();
      let (next, totals) = apply_selection(
        &board,
        slot.clone(),
        select.value()
      );
      if !next.conflicts().is_empty() {
        tracing::debug!(
          day = %slot.day,
          shift_type = %slot.shift_type.as_code(),
          "roster overlap"
        );
      }
      hours.set(totals);
      board.set(next);
    })
  };

  html! {
      <td>
          <select
              class={classes!("roster-select", conflicting.then_some("overlap-warning"))}
              onchange={on_change}
          >
              <option value="" selected={current.is_empty()}>{ "-" }</option>
              {
                  for board.caregivers().iter().map(|caregiver| html! {
                      <option value={caregiver.id.clone()} selected={caregiver.id == current}>
                          { &caregiver.name }
                      </option>
                  })
              }
          </select>
      </td>
  }
}

/// Runs one dropdown change against a copy of `board`. An empty value
/// clears the slot.
fn apply_selection(
  board: &RosterBoard,
  slot: SlotKey,
  value: String
) -> (RosterBoard, Vec<CaregiverHours>) {
  let mut next = board.clone();
  let totals = next.select(slot, Some(value));
  (next, totals)
}

fn render_hours(
  hours: &[CaregiverHours],
  limit: u32
) -> Html {
  html! {
      <table class="hours-table">
          <thead>
              <tr>
                  <th>{ "Caregiver" }</th>
                  <th>{ "Hours" }</th>
              </tr>
          </thead>
          <tbody>
              {
                  for hours.iter().map(|entry| html! {
                      <tr
                          class={classes!(entry.over.then_some("over-hours"))}
                          title={entry.over.then(|| format!("over {limit}h"))}
                      >
                          <td>{ &entry.name }</td>
                          <td>{ format!("{}h", entry.hours) }</td>
                      </tr>
                  })
              }
          </tbody>
      </table>
  }
}

#[cfg(test)]
mod tests {
  use flexy_core::shift::Caregiver;

  use super::*;

  fn caregiver(
    id: &str,
    name: &str
  ) -> Caregiver {
    Caregiver {
      id:    id.to_string(),
      name:  name.to_string(),
      color: None
    }
  }

  #[test]
  fn selections_flag_same_day_clashes_and_total_hours()
  {
    let board = RosterBoard::new(
      vec![
        caregiver("1", "Smith"),
        caregiver("2", "Jones"),
      ],
      40
    );
    let a3 =
      SlotKey::new("Mon", ShiftType::A3);
    let g = SlotKey::new("Mon", ShiftType::G);

    let (board, _) = apply_selection(
      &board,
      a3.clone(),
      "1".to_string()
    );
    let (board, totals) = apply_selection(
      &board,
      g.clone(),
      "1".to_string()
    );
    assert!(board.is_conflicting(&a3));
    assert!(board.is_conflicting(&g));
    assert_eq!(totals[0].hours, 16);
    assert!(!totals[0].over);

    let (board, totals) = apply_selection(
      &board,
      g.clone(),
      String::new()
    );
    assert!(board.conflicts().is_empty());
    assert_eq!(board.assignment(&g), None);
    assert_eq!(totals[0].hours, 8);
  }

  #[test]
  fn selection_leaves_the_original_board_alone()
  {
    let board = RosterBoard::new(
      vec![caregiver("1", "Smith")],
      40
    );
    let slot =
      SlotKey::new("Tue", ShiftType::B1);
    let (next, _) = apply_selection(
      &board,
      slot.clone(),
      "1".to_string()
    );
    assert_eq!(board.assignment(&slot), None);
    assert_eq!(next.assignment(&slot), Some("1"));
  }
}
