mod calendar_page;
mod calendar_views;
mod roster_page;
mod view_components;

use flexy_core::config::FlexyConfig;
use flexy_core::view::{
  VIEW_QUERY_KEY,
  ViewMode
};
use wasm_bindgen::JsValue;
use yew::{
  Html,
  function_component,
  html,
  use_state
};
use yew_router::prelude::{
  BrowserRouter,
  Link,
  Routable,
  Switch
};

use self::calendar_page::CalendarPage;
use self::roster_page::RosterPage;

const FLEXY_CONFIG_TOML: &str =
  include_str!("../assets/flexy.toml");

#[derive(
  Clone, Copy, PartialEq, Eq, Routable,
)]
enum Route {
  #[at("/")]
  Calendar,
  #[at("/roster")]
  Roster,
  #[not_found]
  #[at("/404")]
  NotFound
}

fn load_flexy_config() -> FlexyConfig {
  match FlexyConfig::from_toml_str(
    FLEXY_CONFIG_TOML
  ) {
    | Ok(config) => {
      tracing::info!(
        api_base = %config.api_base,
        timezone = %config.timezone,
        default_view = %config.default_view,
        "loaded flexy config"
      );
      config
    }
    | Err(error) => {
      tracing::error!(%error, "failed parsing flexy config; using defaults");
      FlexyConfig::default()
    }
  }
}

#[function_component(App)]
pub fn app() -> Html {
  let config =
    use_state(load_flexy_config);

  let render = {
    let config = (*config).clone();
    move |route: Route| match route {
      | Route::Roster => html! {
          <RosterPage config={config.clone()} />
      },
      | Route::Calendar
      | Route::NotFound => html! {
          <CalendarPage config={config.clone()} />
      }
    }
  };

  html! {
      <BrowserRouter>
          <nav class="top-nav">
              <Link<Route> to={Route::Calendar} classes="nav-link">{ "Calendar" }</Link<Route>>
              <Link<Route> to={Route::Roster} classes="nav-link">{ "Weekly roster" }</Link<Route>>
          </nav>
          <main class="page">
              <Switch<Route> render={render} />
          </main>
      </BrowserRouter>
  }
}

/// Blocking alert, the way every failed request is surfaced.
fn show_alert(message: &str) {
  tracing::warn!(%message, "alert");
  if let Some(window) = web_sys::window()
    && let Err(err) =
      window.alert_with_message(message)
  {
    tracing::error!(error = ?err, "alert failed");
  }
}

fn confirm(message: &str) -> bool {
  web_sys::window()
    .and_then(|window| {
      window
        .confirm_with_message(message)
        .ok()
    })
    .unwrap_or(false)
}

/// View named in the page's `?view=` parameter, if any.
fn view_from_location() -> Option<ViewMode>
{
  let search = web_sys::window()?
    .location()
    .search()
    .ok()?;
  ViewMode::from_query(&search)
}

/// Writes the view into the query string without reloading the page.
fn sync_view_url(mode: ViewMode) {
  let Some(window) = web_sys::window()
  else {
    return;
  };
  let Ok(href) = window.location().href()
  else {
    return;
  };
  let Ok(url) = web_sys::Url::new(&href)
  else {
    tracing::warn!(%href, "cannot parse page url");
    return;
  };
  url
    .search_params()
    .set(VIEW_QUERY_KEY, mode.as_key());

  let pushed = window
    .history()
    .and_then(|history| {
      history.push_state_with_url(
        &JsValue::NULL,
        "",
        Some(&url.href())
      )
    });
  if let Err(err) = pushed {
    tracing::warn!(error = ?err, "failed to update page url");
  }
}

fn open_in_new_tab(url: &str) {
  let opened = web_sys::window()
    .map(|window| {
      window.open_with_url_and_target(
        url, "_blank"
      )
    });
  if let Some(Err(err)) = opened {
    tracing::error!(error = ?err, %url, "failed to open url");
  }
}

fn navigate_to(url: &str) {
  if let Some(window) = web_sys::window()
    && let Err(err) =
      window.location().set_href(url)
  {
    tracing::error!(error = ?err, %url, "failed to navigate");
  }
}
