use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use flexy_core::datetime::{format_clock, format_shift_datetime};
use flexy_core::grid::{CellKey, GridCell, MonthGrid, TimeGrid};
use flexy_core::overlay::{DayBadges, TimedOverlay};
use flexy_core::roster::{CaregiverHours, SlotKey};
use flexy_core::shift::{Caregiver, ShiftRecord, ShiftTemplate};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_time_grid(
        &self,
        label: &str,
        grid: &TimeGrid,
        overlays: &[TimedOverlay],
    ) -> anyhow::Result<()> {
        self.write_time_grid(io::stdout().lock(), label, grid, overlays)
    }

    pub fn write_time_grid<W: Write>(
        &self,
        mut out: W,
        label: &str,
        grid: &TimeGrid,
        overlays: &[TimedOverlay],
    ) -> anyhow::Result<()> {
        writeln!(out, "{label}")?;
        writeln!(out)?;

        let mut by_cell: BTreeMap<&CellKey, Vec<String>> = BTreeMap::new();
        for overlay in overlays {
            by_cell
                .entry(&overlay.cell)
                .or_default()
                .push(format!("{} {}", overlay.initials, overlay.shift_type));
        }

        let mut headers = vec!["Time".to_string()];
        headers.extend(grid.headers.iter().map(|header| {
            let text = format!("{} {}", header.weekday, header.label);
            if header.today {
                self.paint(&text, "33")
            } else if header.weekend {
                self.paint(&text, "2")
            } else {
                text
            }
        }));

        let rows = grid
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![row.label.clone()];
                cells.extend(row.cells.iter().map(|cell| {
                    by_cell
                        .get(&cell.key)
                        .map(|labels| self.paint(&labels.join("\n"), "36"))
                        .unwrap_or_default()
                }));
                cells
            })
            .collect();

        write_table(&mut out, headers, rows)
    }

    #[tracing::instrument(skip_all)]
    pub fn print_month_grid(
        &self,
        label: &str,
        grid: &MonthGrid,
        badges: &BTreeMap<NaiveDate, DayBadges>,
    ) -> anyhow::Result<()> {
        self.write_month_grid(io::stdout().lock(), label, grid, badges)
    }

    pub fn write_month_grid<W: Write>(
        &self,
        mut out: W,
        label: &str,
        grid: &MonthGrid,
        badges: &BTreeMap<NaiveDate, DayBadges>,
    ) -> anyhow::Result<()> {
        writeln!(out, "{label}")?;
        writeln!(out)?;

        let mut headers = vec!["Week".to_string()];
        headers.extend(grid.weekdays.iter().cloned());

        let rows = grid
            .weeks
            .iter()
            .map(|week| {
                let mut cells = vec![week.label.clone()];
                cells.extend(
                    week.cells
                        .iter()
                        .map(|cell| self.month_cell(cell, badges.get(&cell.key.date()))),
                );
                cells
            })
            .collect();

        write_table(&mut out, headers, rows)
    }

    fn month_cell(&self, cell: &GridCell, day: Option<&DayBadges>) -> String {
        let number = cell.key.date().format("%-d").to_string();
        let number = if cell.today {
            self.paint(&number, "33")
        } else if cell.overflow || cell.weekend {
            self.paint(&number, "2")
        } else {
            number
        };

        let mut lines = vec![number];
        if let Some(day) = day {
            lines.extend(day.visible.iter().map(|badge| self.paint(&badge.label, "36")));
            if let Some(more) = &day.more {
                lines.push(more.label());
            }
        }
        lines.join("\n")
    }

    #[tracing::instrument(skip_all)]
    pub fn print_shift_table(&self, shifts: &[ShiftRecord]) -> anyhow::Result<()> {
        self.write_shift_table(io::stdout().lock(), shifts)
    }

    pub fn write_shift_table<W: Write>(&self, out: W, shifts: &[ShiftRecord]) -> anyhow::Result<()> {
        let headers = ["ID", "Date", "Type", "Start", "End", "Caregiver"]
            .map(str::to_string)
            .to_vec();
        let rows = shifts
            .iter()
            .map(|shift| {
                vec![
                    self.paint(&shift.id, "33"),
                    shift.start_date().to_string(),
                    shift.shift_type.clone(),
                    format_clock(shift.start.time()),
                    format_clock(shift.end.time()),
                    shift
                        .caregiver_name
                        .clone()
                        .unwrap_or_else(|| shift.caregiver_id.clone()),
                ]
            })
            .collect();
        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip_all)]
    pub fn print_shift_info(&self, shift: &ShiftRecord) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "id         {}", shift.id)?;
        writeln!(out, "type       {}", shift.shift_type)?;
        writeln!(out, "start      {}", format_shift_datetime(shift.start))?;
        writeln!(out, "end        {}", format_shift_datetime(shift.end))?;
        writeln!(out, "caregiver  {}", shift.caregiver_id)?;
        if let Some(name) = &shift.caregiver_name {
            writeln!(out, "name       {name}")?;
        }
        writeln!(out, "color      {}", shift.color_or_default())?;
        Ok(())
    }

    pub fn print_caregivers(&self, caregivers: &[Caregiver]) -> anyhow::Result<()> {
        let rows = caregivers
            .iter()
            .map(|caregiver| {
                vec![
                    self.paint(&caregiver.id, "33"),
                    caregiver.name.clone(),
                    caregiver.color.clone().unwrap_or_default(),
                ]
            })
            .collect();
        write_table(
            io::stdout().lock(),
            vec!["ID".to_string(), "Name".to_string(), "Color".to_string()],
            rows,
        )
    }

    pub fn print_templates(&self, templates: &[ShiftTemplate]) -> anyhow::Result<()> {
        let rows = templates
            .iter()
            .map(|template| vec![self.paint(&template.id, "33"), template.name.clone()])
            .collect();
        write_table(
            io::stdout().lock(),
            vec!["ID".to_string(), "Name".to_string()],
            rows,
        )
    }

    #[tracing::instrument(skip_all)]
    pub fn print_roster(
        &self,
        hours: &[CaregiverHours],
        conflicts: &BTreeSet<SlotKey>,
        hour_limit: u32,
    ) -> anyhow::Result<()> {
        self.write_roster(io::stdout().lock(), hours, conflicts, hour_limit)
    }

    pub fn write_roster<W: Write>(
        &self,
        mut out: W,
        hours: &[CaregiverHours],
        conflicts: &BTreeSet<SlotKey>,
        hour_limit: u32,
    ) -> anyhow::Result<()> {
        let rows = hours
            .iter()
            .map(|entry| {
                let total = format!("{}h", entry.hours);
                let (total, flag) = if entry.over {
                    (self.paint(&total, "31"), format!("over {hour_limit}h"))
                } else {
                    (total, String::new())
                };
                vec![entry.caregiver_id.clone(), entry.name.clone(), total, flag]
            })
            .collect();
        write_table(
            &mut out,
            ["ID", "Name", "Hours", ""].map(str::to_string).to_vec(),
            rows,
        )?;

        writeln!(out)?;
        if conflicts.is_empty() {
            writeln!(out, "No overlapping shifts.")?;
        } else {
            writeln!(out, "{}", self.paint("Overlapping shifts:", "31"))?;
            for slot in conflicts {
                writeln!(out, "  {} {}", slot.day, slot.shift_type)?;
            }
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        text.lines()
            .map(|line| format!("\x1b[{code}m{line}\x1b[0m"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Column-aligned table. Cells may hold several lines; a row is as tall as
/// its tallest cell.
fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(visible_width(header));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            for line in cell.lines() {
                widths[idx] = widths[idx].max(visible_width(line));
            }
        }
    }

    write_line(&mut writer, &headers.iter().map(String::as_str).collect::<Vec<_>>(), &widths)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = width)?;
    }
    writeln!(writer)?;

    for row in rows {
        let split: Vec<Vec<&str>> = row.iter().map(|cell| cell.lines().collect()).collect();
        let height = split.iter().map(Vec::len).max().unwrap_or(0).max(1);
        for line_idx in 0..height {
            let line: Vec<&str> = (0..column_count)
                .map(|idx| {
                    split
                        .get(idx)
                        .and_then(|lines| lines.get(line_idx))
                        .copied()
                        .unwrap_or("")
                })
                .collect();
            write_line(&mut writer, &line, &widths)?;
        }
    }

    Ok(())
}

fn write_line<W: Write>(writer: &mut W, cells: &[&str], widths: &[usize]) -> anyhow::Result<()> {
    for (cell, width) in cells.iter().zip(widths) {
        let padding = width.saturating_sub(visible_width(cell));
        write!(writer, "{}{} ", cell, " ".repeat(padding))?;
    }
    writeln!(writer)?;
    Ok(())
}

fn visible_width(s: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(s).as_str())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use flexy_core::datetime::parse_shift_datetime;
    use flexy_core::grid::{GridLayout, build_grid};
    use flexy_core::overlay::{group_monthly_badges, place_timed_shifts};
    use flexy_core::shift::ShiftType;
    use flexy_core::view::{ViewMode, ViewState};

    use super::*;

    fn plain() -> Renderer {
        Renderer { color: false }
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
            color: None,
        }
    }

    fn render<F>(write: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> anyhow::Result<()>,
    {
        let mut buffer = Vec::new();
        write(&mut buffer).expect("render succeeds");
        String::from_utf8(buffer).expect("utf8 output")
    }

    #[test]
    fn hourly_grid_prints_buckets_and_labels() {
        let state = ViewState::new(ViewMode::Hourly, date(2024, 3, 15));
        let GridLayout::Timed(grid) = build_grid(&state, date(2024, 3, 1)) else {
            panic!("expected a timed grid");
        };
        let shifts = vec![
            shift("1", "A3", "2024-03-15 07:00", "2024-03-15 14:00"),
            shift("2", "A2", "2024-03-15 06:30", "2024-03-15 10:00"),
        ];
        let overlays = place_timed_shifts(&shifts, &state, &GridLayout::Timed(grid.clone()));

        let text = render(|out| plain().write_time_grid(out, &state.range_label(), &grid, &overlays));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Mar 15, 2024 - Mar 17, 2024");
        assert!(lines[2].starts_with("Time "));
        assert!(lines[2].contains("Fri Mar 15"));
        let bucket = lines
            .iter()
            .position(|line| line.starts_with("06:00-08:00"))
            .expect("06:00 bucket row");
        assert!(lines[bucket].contains("JD A3"));
        assert!(lines[bucket + 1].contains("JD A2"));
        assert!(lines[bucket + 2].starts_with("08:00-10:00"));
    }

    #[test]
    fn month_grid_prints_badges_and_more() {
        let state = ViewState::new(ViewMode::Monthly, date(2024, 3, 1));
        let GridLayout::Month(grid) = build_grid(&state, date(2024, 2, 1)) else {
            panic!("expected a month grid");
        };
        let shifts: Vec<_> = (1..=4)
            .map(|n| shift(&n.to_string(), "G", "2024-03-06 10:00", "2024-03-06 18:00"))
            .collect();
        let badges = group_monthly_badges(&shifts, 3);

        let text = render(|out| plain().write_month_grid(out, "March 2024", &grid, &badges));
        assert!(text.starts_with("March 2024\n"));
        assert!(text.contains("26/2 - 3/3"));
        assert_eq!(text.matches("JD G").count(), 3);
        assert!(text.contains("+1 more"));
    }

    #[test]
    fn roster_report_flags_over_hours_and_clashes() {
        let hours = vec![
            CaregiverHours {
                caregiver_id: "1".to_string(),
                name: "Smith".to_string(),
                hours: 48,
                over: true,
            },
            CaregiverHours {
                caregiver_id: "2".to_string(),
                name: "Jones".to_string(),
                hours: 8,
                over: false,
            },
        ];
        let conflicts = BTreeSet::from([
            SlotKey::new("Mon", ShiftType::A3),
            SlotKey::new("Mon", ShiftType::G),
        ]);
        let text = render(|out| plain().write_roster(out, &hours, &conflicts, 40));
        let smith = text
            .lines()
            .find(|line| line.starts_with("1 "))
            .expect("smith row");
        assert!(smith.contains("48h"));
        assert!(smith.trim_end().ends_with("over 40h"));
        assert!(text.contains("  Mon A3\n"));
        assert!(text.contains("  Mon G\n"));
    }

    #[test]
    fn table_columns_ignore_escape_codes() {
        let colored = Renderer { color: true };
        let text = render(|out| {
            write_table(
                out,
                vec!["ID".to_string(), "Name".to_string()],
                vec![vec![colored.paint("7", "33"), "Ann".to_string()]],
            )
        });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(strip_ansi(lines[2]), "7  Ann  ");
    }
}
