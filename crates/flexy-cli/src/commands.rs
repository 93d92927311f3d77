use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, anyhow};
use flexy_core::api::{ApiError, Operation, ShiftApi};
use flexy_core::config::FlexyConfig;
use flexy_core::editor::{self, EditorOutcome, EditorState};
use flexy_core::grid::{GridLayout, build_grid};
use flexy_core::overlay::{group_monthly_badges, place_timed_shifts};
use flexy_core::roster::RosterSheet;
use flexy_core::template::GenerateRequest;
use flexy_core::view::{Direction, ViewState};
use tracing::{debug, info};

use crate::cli::{AddArgs, Command, EditArgs, GenerateArgs, WindowArgs};
use crate::client::HttpShiftApi;
use crate::render::Renderer;

const DELETE_PROMPT: &str = "Are you sure you want to delete this shift?";

#[tracing::instrument(skip_all)]
pub async fn dispatch(
    client: &HttpShiftApi,
    config: &FlexyConfig,
    renderer: &Renderer,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::View(window) => cmd_view(client, config, renderer, &window).await,
        Command::List(window) => cmd_list(client, config, renderer, &window).await,
        Command::Show { id } => cmd_show(client, renderer, &id).await,
        Command::Add(args) => cmd_add(client, config, renderer, args).await,
        Command::Edit(args) => cmd_edit(client, renderer, args).await,
        Command::Delete { id, yes } => cmd_delete(client, &id, yes).await,
        Command::ExportIcs { window, output } => cmd_export_ics(client, config, &window, &output).await,
        Command::Generate(args) => cmd_generate(client, config, args).await,
        Command::Templates => {
            let templates = client
                .list_templates()
                .await
                .map_err(alert(Operation::LoadTemplates))?;
            renderer.print_templates(&templates)
        }
        Command::Caregivers => {
            let caregivers = client
                .list_caregivers()
                .await
                .map_err(alert(Operation::LoadCaregivers))?;
            renderer.print_caregivers(&caregivers)
        }
        Command::Roster { file } => cmd_roster(config, renderer, &file),
        Command::Audit => {
            println!("{}", client.paths().audit_page());
            Ok(())
        }
    }
}

fn alert(operation: Operation) -> impl FnOnce(ApiError) -> anyhow::Error {
    move |err| anyhow!(err.user_message(operation.alert_context()))
}

/// Anchor and mode for a window command, after `--prev`/`--next` steps.
pub fn window_state(config: &FlexyConfig, args: &WindowArgs) -> anyhow::Result<ViewState> {
    let mode = args.view_mode()?.unwrap_or_else(|| config.view_mode());
    let anchor = args.date.unwrap_or_else(|| config.today());
    let mut state = ViewState::new(mode, anchor);

    for _ in 0..args.prev {
        state = state.navigate(Direction::Previous).state;
    }
    for _ in 0..args.next {
        state = state.navigate(Direction::Next).state;
    }

    debug!(view = %state.mode, anchor = %state.anchor, "resolved window");
    Ok(state)
}

async fn cmd_view(
    client: &HttpShiftApi,
    config: &FlexyConfig,
    renderer: &Renderer,
    args: &WindowArgs,
) -> anyhow::Result<()> {
    let state = window_state(config, args)?;
    let shifts = client
        .list_shifts(state.visible_window())
        .await
        .map_err(alert(Operation::LoadShifts))?;
    info!(count = shifts.len(), "loaded shifts");

    let label = state.range_label();
    let layout = build_grid(&state, config.today());
    match &layout {
        GridLayout::Timed(grid) => {
            let overlays = place_timed_shifts(&shifts, &state, &layout);
            renderer.print_time_grid(&label, grid, &overlays)
        }
        GridLayout::Month(grid) => {
            let badges = group_monthly_badges(&shifts, config.max_badges_per_day);
            renderer.print_month_grid(&label, grid, &badges)
        }
    }
}

async fn cmd_list(
    client: &HttpShiftApi,
    config: &FlexyConfig,
    renderer: &Renderer,
    args: &WindowArgs,
) -> anyhow::Result<()> {
    let state = window_state(config, args)?;
    let mut shifts = client
        .list_shifts(state.visible_window())
        .await
        .map_err(alert(Operation::LoadShifts))?;
    shifts.sort_by_key(|shift| shift.start);

    println!("{}", state.range_label());
    renderer.print_shift_table(&shifts)
}

async fn cmd_show(client: &HttpShiftApi, renderer: &Renderer, id: &str) -> anyhow::Result<()> {
    let shift = client
        .get_shift(id)
        .await
        .map_err(alert(Operation::LoadShift))?;
    renderer.print_shift_info(&shift)
}

async fn cmd_add(
    client: &HttpShiftApi,
    config: &FlexyConfig,
    renderer: &Renderer,
    args: AddArgs,
) -> anyhow::Result<()> {
    let mut state = EditorState::open_for_add(
        args.date,
        args.shift_type.unwrap_or_else(|| config.shift_type()),
    );
    if let Some(form) = state.form_mut() {
        form.caregiver_id = args.caregiver;
        if args.start.is_some() {
            form.start = args.start;
        }
        if args.end.is_some() {
            form.end = args.end;
        }
    }

    finish(renderer, editor::submit(client, &state).await?)
}

async fn cmd_edit(client: &HttpShiftApi, renderer: &Renderer, args: EditArgs) -> anyhow::Result<()> {
    let mut state = editor::load_for_edit(client, &args.id).await?;
    if let Some(kind) = args.shift_type {
        state.change_shift_type(kind);
    }
    if let Some(form) = state.form_mut() {
        if let Some(date) = args.date {
            form.date = Some(date);
        }
        if let Some(caregiver) = args.caregiver {
            form.caregiver_id = caregiver;
        }
        if args.start.is_some() {
            form.start = args.start;
        }
        if args.end.is_some() {
            form.end = args.end;
        }
    }

    finish(renderer, editor::submit(client, &state).await?)
}

async fn cmd_delete(client: &HttpShiftApi, id: &str, yes: bool) -> anyhow::Result<()> {
    let state = editor::load_for_edit(client, id).await?;
    let confirmed = yes || confirm(DELETE_PROMPT)?;
    match editor::delete(client, &state, confirmed).await? {
        EditorOutcome::Deleted(id) => println!("Deleted shift {id}."),
        _ => println!("Nothing deleted."),
    }
    Ok(())
}

fn finish(renderer: &Renderer, outcome: EditorOutcome) -> anyhow::Result<()> {
    match outcome {
        EditorOutcome::Saved(shift) => renderer.print_shift_info(&shift),
        EditorOutcome::Deleted(id) => {
            println!("Deleted shift {id}.");
            Ok(())
        }
        EditorOutcome::Cancelled => Ok(()),
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{prompt} [y/N] ")?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

async fn cmd_export_ics(
    client: &HttpShiftApi,
    config: &FlexyConfig,
    args: &WindowArgs,
    output: &Path,
) -> anyhow::Result<()> {
    let window = window_state(config, args)?.visible_window();
    let body = client
        .download_ics(window)
        .await
        .map_err(alert(Operation::ExportIcs))?;
    fs::write(output, body).with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "Saved calendar {} - {} to {}.",
        window.start_key(),
        window.end_key(),
        output.display()
    );
    Ok(())
}

async fn cmd_generate(
    client: &HttpShiftApi,
    config: &FlexyConfig,
    args: GenerateArgs,
) -> anyhow::Result<()> {
    let request = GenerateRequest::from_form(
        args.template.as_deref(),
        args.months.as_deref().unwrap_or_default(),
        args.start.unwrap_or_else(|| config.today()),
    )?;
    client
        .apply_template(&request)
        .await
        .map_err(alert(Operation::ApplyTemplate))?;
    info!(template = %request.template_id, count = request.count, "applied template");
    println!(
        "Applied template {} for {} months from {}.",
        request.template_id, request.count, request.start_date
    );
    Ok(())
}

#[tracing::instrument(skip(config, renderer))]
fn cmd_roster(config: &FlexyConfig, renderer: &Renderer, file: &Path) -> anyhow::Result<()> {
    let raw = fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let sheet: RosterSheet =
        toml::from_str(&raw).with_context(|| format!("failed to parse roster {}", file.display()))?;
    let board = sheet.into_board(config.weekly_hour_limit);

    renderer.print_roster(
        &board.recompute_hours(),
        &board.scan_conflicts(),
        board.hour_limit(),
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use flexy_core::view::ViewMode;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn window_uses_config_view_and_steps() {
        let config = FlexyConfig {
            default_view: "hourly".to_string(),
            ..FlexyConfig::default()
        };
        let args = WindowArgs {
            date: Some(date(2024, 3, 15)),
            next: 2,
            ..WindowArgs::default()
        };
        let state = window_state(&config, &args).expect("valid window");
        assert_eq!(state.mode, ViewMode::Hourly);
        assert_eq!(state.anchor, date(2024, 3, 21));

        let args = WindowArgs {
            view: Some("weekly".to_string()),
            date: Some(date(2024, 3, 15)),
            prev: 1,
            next: 1,
        };
        let state = window_state(&config, &args).expect("valid window");
        assert_eq!(state.mode, ViewMode::Weekly);
        assert_eq!(state.anchor, date(2024, 3, 15));
    }

    #[test]
    fn roster_file_is_read_and_checked() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("week.toml");
        fs::write(
            &path,
            "[[caregivers]]\nid = \"1\"\nname = \"Smith\"\n\n\
             [[assignments]]\nday = \"Mon\"\nshift = \"A3\"\ncaregiver = \"1\"\n",
        )
        .expect("write roster");
        let renderer = Renderer::new(false);
        cmd_roster(&FlexyConfig::default(), &renderer, &path).expect("roster renders");

        let missing = temp.path().join("missing.toml");
        let err = cmd_roster(&FlexyConfig::default(), &renderer, &missing).expect_err("missing file");
        assert!(format!("{err:#}").contains("missing.toml"));
    }
}
