use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::{NaiveDate, NaiveTime};
use clap::{ArgAction, Args, Parser, Subcommand};
use flexy_core::datetime::{parse_clock, parse_input_date};
use flexy_core::shift::ShiftType;
use flexy_core::view::ViewMode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "flexy",
    version,
    about = "Flexy: caregiver shift calendar in the terminal"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Config file; defaults to $FLEXY_CONFIG, then the user config dir.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL, overriding `api_base` from the config.
    #[arg(long = "api", global = true)]
    pub api: Option<String>,

    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the hourly, weekly or monthly grid with shifts placed on it.
    View(WindowArgs),
    /// List the shifts in the visible window as a table.
    List(WindowArgs),
    /// Show one shift.
    Show { id: String },
    /// Create a shift.
    Add(AddArgs),
    /// Change an existing shift.
    Edit(EditArgs),
    /// Delete a shift.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Save the iCalendar export for the visible window.
    ExportIcs {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long = "output", short = 'o')]
        output: PathBuf,
    },
    /// Stamp a template onto the calendar.
    Generate(GenerateArgs),
    /// List shift templates.
    Templates,
    /// List caregivers.
    Caregivers,
    /// Check a roster file for hours over the limit and clashing shifts.
    Roster {
        file: PathBuf,
    },
    /// Print the audit page address.
    Audit,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// hourly, weekly or monthly.
    #[arg(long = "view")]
    pub view: Option<String>,

    /// Anchor date (YYYY-MM-DD); defaults to today.
    #[arg(long = "date", value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,

    /// Steps back from the anchor by the view's stride.
    #[arg(long = "prev", default_value_t = 0)]
    pub prev: u32,

    /// Steps forward from the anchor by the view's stride.
    #[arg(long = "next", default_value_t = 0)]
    pub next: u32,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(long = "date", value_parser = parse_date_arg)]
    pub date: NaiveDate,

    #[arg(long = "caregiver")]
    pub caregiver: String,

    /// Shift type code; defaults to the configured type.
    #[arg(long = "type", value_parser = parse_shift_type_arg)]
    pub shift_type: Option<ShiftType>,

    /// Start time (HH:MM); defaults to the type's start.
    #[arg(long = "start", value_parser = parse_clock_arg)]
    pub start: Option<NaiveTime>,

    /// End time (HH:MM); defaults to the type's end.
    #[arg(long = "end", value_parser = parse_clock_arg)]
    pub end: Option<NaiveTime>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,

    #[arg(long = "date", value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,

    #[arg(long = "caregiver")]
    pub caregiver: Option<String>,

    /// Changing the type refills start and end unless they are given too.
    #[arg(long = "type", value_parser = parse_shift_type_arg)]
    pub shift_type: Option<ShiftType>,

    #[arg(long = "start", value_parser = parse_clock_arg)]
    pub start: Option<NaiveTime>,

    #[arg(long = "end", value_parser = parse_clock_arg)]
    pub end: Option<NaiveTime>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(long = "template")]
    pub template: Option<String>,

    /// Number of months to fill (1-12).
    #[arg(long = "months")]
    pub months: Option<String>,

    /// First day to fill; defaults to today.
    #[arg(long = "start", value_parser = parse_date_arg)]
    pub start: Option<NaiveDate>,
}

impl WindowArgs {
    pub fn view_mode(&self) -> anyhow::Result<Option<ViewMode>> {
        self.view
            .as_deref()
            .map(|raw| {
                ViewMode::from_key(raw.trim())
                    .ok_or_else(|| anyhow!("unknown view: {raw} (expected hourly, weekly or monthly)"))
            })
            .transpose()
    }
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_input_date(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got: {raw}"))
}

fn parse_clock_arg(raw: &str) -> Result<NaiveTime, String> {
    parse_clock(raw).ok_or_else(|| format!("expected HH:MM, got: {raw}"))
}

fn parse_shift_type_arg(raw: &str) -> Result<ShiftType, String> {
    raw.parse::<ShiftType>()
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
