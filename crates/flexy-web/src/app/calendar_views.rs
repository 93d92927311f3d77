use std::collections::BTreeMap;

use chrono::NaiveDate;
use flexy_core::grid::{
  CellKey,
  GridCell,
  GridLayout,
  MonthGrid,
  TimeGrid
};
use flexy_core::overlay::{
  DayBadges,
  TimedOverlay,
  group_monthly_badges,
  place_timed_shifts
};
use flexy_core::shift::ShiftRecord;
use flexy_core::view::ViewState;
use web_sys::MouseEvent;
use yew::{
  Callback,
  Html,
  classes,
  html
};

/// Rebuilds the whole grid for `state` and places `shifts` on it.
pub(super) fn render_calendar_view(
  state: &ViewState,
  layout: &GridLayout,
  shifts: &[ShiftRecord],
  max_badges: usize,
  on_slot: Callback<(NaiveDate, u32)>,
  on_day: Callback<NaiveDate>,
  on_shift: Callback<String>
) -> Html {
  match layout {
    | GridLayout::Timed(grid) => {
      let overlays = place_timed_shifts(
        shifts, state, layout
      );
      render_time_grid(
        grid, &overlays, on_slot, on_shift
      )
    }
    | GridLayout::Month(grid) => {
      let badges = group_monthly_badges(
        shifts, max_badges
      );
      render_month_grid(
        grid, &badges, on_day, on_shift
      )
    }
  }
}

/// Click handler for a shift element. Stops the click from reaching the
/// cell underneath, which would open the add form.
fn shift_click(
  on_shift: &Callback<String>,
  shift_id: &str
) -> Callback<MouseEvent> {
  let on_shift = on_shift.clone();
  let shift_id = shift_id.to_string();
  Callback::from(
    move |event: MouseEvent| {
      event.stop_propagation();
      on_shift.emit(shift_id.clone());
    }
  )
}

fn cell_classes(
  base: &'static str,
  cell: &GridCell
) -> yew::Classes {
  classes!(
    base,
    cell.today.then_some("today"),
    cell.weekend.then_some("weekend"),
    cell.overflow.then_some("other-month")
  )
}

fn render_time_grid(
  grid: &TimeGrid,
  overlays: &[TimedOverlay],
  on_slot: Callback<(NaiveDate, u32)>,
  on_shift: Callback<String>
) -> Html {
  let mut by_cell: BTreeMap<
    CellKey,
    Vec<&TimedOverlay>
  > = BTreeMap::new();
  for overlay in overlays {
    by_cell
      .entry(overlay.cell)
      .or_default()
      .push(overlay);
  }

  html! {
      <table class="calendar-grid time-grid">
          <thead>
              <tr>
                  <th class="time-col"></th>
                  {
                      for grid.headers.iter().map(|header| html! {
                          <th class={classes!(
                              "day-header",
                              header.today.then_some("today"),
                              header.weekend.then_some("weekend")
                          )}>
                              <div class="day-name">{ &header.weekday }</div>
                              <div class="day-date">{ &header.label }</div>
                          </th>
                      })
                  }
              </tr>
          </thead>
          <tbody>
              {
                  for grid.rows.iter().map(|row| html! {
                      <tr>
                          <td class="time-label">{ &row.label }</td>
                          {
                              for row.cells.iter().map(|cell| {
                                  let CellKey::Slot { date, hour } = cell.key else {
                                      return html! {};
                                  };
                                  let on_slot = on_slot.clone();
                                  let placed = by_cell
                                      .get(&cell.key)
                                      .map(Vec::as_slice)
                                      .unwrap_or_default();
                                  html! {
                                      <td
                                          class={cell_classes("time-slot", cell)}
                                          data-date={cell.key.date_key()}
                                          data-hour={hour.to_string()}
                                          onclick={Callback::from(move |_| on_slot.emit((date, hour)))}
                                      >
                                          { for placed.iter().map(|overlay| render_timed_overlay(overlay, &on_shift)) }
                                      </td>
                                  }
                              })
                          }
                      </tr>
                  })
              }
          </tbody>
      </table>
  }
}

fn render_timed_overlay(
  overlay: &TimedOverlay,
  on_shift: &Callback<String>
) -> Html {
  let style = format!(
    "top: {:.2}%; height: {:.2}%; \
     background-color: {};",
    overlay.top_percent,
    overlay.height_percent,
    overlay.color
  );
  let title = format!(
    "{} {} ({} min)",
    overlay.initials,
    overlay.shift_type,
    overlay.duration
  );

  html! {
      <div
          class="shift-item"
          style={style}
          title={title}
          data-shift-id={overlay.shift_id.clone()}
          onclick={shift_click(on_shift, &overlay.shift_id)}
      >
          <span class="caregiver-initials">{ &overlay.initials }</span>
          <span class="shift-type">{ &overlay.shift_type }</span>
      </div>
  }
}

fn render_month_grid(
  grid: &MonthGrid,
  badges: &BTreeMap<NaiveDate, DayBadges>,
  on_day: Callback<NaiveDate>,
  on_shift: Callback<String>
) -> Html {
  html! {
      <table class="calendar-grid month-grid">
          <thead>
              <tr>
                  <th class="week-col"></th>
                  { for grid.weekdays.iter().map(|day| html! { <th class="day-header">{ day }</th> }) }
              </tr>
          </thead>
          <tbody>
              {
                  for grid.weeks.iter().map(|week| html! {
                      <tr>
                          <td class="week-label">{ &week.label }</td>
                          {
                              for week.cells.iter().map(|cell| {
                                  render_month_cell(
                                      cell,
                                      badges.get(&cell.key.date()),
                                      &on_day,
                                      &on_shift
                                  )
                              })
                          }
                      </tr>
                  })
              }
          </tbody>
      </table>
  }
}

fn render_month_cell(
  cell: &GridCell,
  day: Option<&DayBadges>,
  on_day: &Callback<NaiveDate>,
  on_shift: &Callback<String>
) -> Html {
  let date = cell.key.date();
  let on_day = on_day.clone();

  html! {
      <td
          class={cell_classes("month-day", cell)}
          data-date={cell.key.date_key()}
          onclick={Callback::from(move |_| on_day.emit(date))}
      >
          <div class="day-number">{ date.format("%-d").to_string() }</div>
          {
              for day.into_iter().flat_map(|day| day.visible.iter()).map(|badge| html! {
                  <div
                      class="shift-badge"
                      style={format!("background-color: {};", badge.color)}
                      onclick={shift_click(on_shift, &badge.shift_id)}
                  >
                      { &badge.label }
                  </div>
              })
          }
          {
              match day.and_then(|day| day.more.as_ref()) {
                  | Some(more) => html! {
                      <div
                          class="shift-badge more-badge"
                          onclick={shift_click(on_shift, &more.opens_id)}
                      >
                          { more.label() }
                      </div>
                  },
                  | None => html! {}
              }
          }
      </td>
  }
}
