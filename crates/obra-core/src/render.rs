use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use chrono::{NaiveDate, Weekday};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::grid::{CalendarGrid, calendar_title, weekday_labels};
use crate::intent::UpdateRequest;
use crate::kanban::{KanbanBoard, is_complete};
use crate::status::CanonicalStatus;
use crate::task::{Priority, Task, clamp_progress};

const TITLE_WIDTH: usize = 22;
const LINK_WIDTH: usize = 40;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// Colour is only used when enabled and stdout is a terminal.
    pub fn new(color: bool) -> Self {
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all, fields(cells = grid.cells.len()))]
    pub fn render_calendar<W: Write>(
        &self,
        mut out: W,
        grid: &CalendarGrid<'_>,
        week_start: Weekday,
        cap: usize,
        today: NaiveDate,
        summary: &BTreeMap<CanonicalStatus, usize>,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "{}",
            self.paint(&calendar_title(grid.mode, grid.reference, week_start), "1")
        )?;
        writeln!(out)?;

        let headers = weekday_labels(week_start)
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let rows = grid
            .weeks()
            .map(|week| {
                week.iter()
                    .map(|cell| {
                        let mut lines = Vec::with_capacity(cap + 2);
                        let mut label = format!("{:>2}", cell.date.format("%d"));
                        if cell.date == today {
                            label.push('*');
                        }
                        lines.push(if cell.is_current_month {
                            label
                        } else {
                            self.paint(&label, "2")
                        });

                        let (shown, hidden) = cell.visible(cap);
                        for task in shown {
                            lines.push(self.task_line(task));
                        }
                        if hidden > 0 {
                            lines.push(self.paint(&format!("+{hidden} more"), "36"));
                        }
                        lines
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        write_grid(&mut out, headers, rows)?;

        writeln!(out)?;
        let totals = summary
            .iter()
            .map(|(status, count)| format!("{}: {count}", status.label()))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "{totals}")?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(tasks = board.len()))]
    pub fn render_board<W: Write>(&self, mut out: W, board: &KanbanBoard<'_>) -> anyhow::Result<()> {
        let headers = board
            .iter()
            .map(|(status, tasks)| format!("{} ({})", status.label(), tasks.len()))
            .collect::<Vec<_>>();

        let cells = board
            .iter()
            .map(|(_, tasks)| {
                let mut lines = Vec::with_capacity(tasks.len() * 2);
                for task in tasks {
                    let check = if is_complete(task) { "[x]" } else { "[ ]" };
                    lines.push(format!("{check} {}", truncate(display_title(task), TITLE_WIDTH)));
                    lines.push(format!(
                        "    {} {}% {} / {}",
                        self.priority_badge(task.priority()),
                        clamp_progress(task.progress),
                        task.assignee_label(),
                        task.project_label()
                    ));
                    // Links are shown as given, never validated.
                    for link in &task.external_links {
                        lines.push(format!("    ↗ {}", truncate(link, LINK_WIDTH)));
                    }
                }
                lines
            })
            .collect::<Vec<_>>();

        write_grid(&mut out, headers, vec![cells])?;
        Ok(())
    }

    pub fn render_requests<W: Write>(
        &self,
        mut out: W,
        requests: &[UpdateRequest],
    ) -> anyhow::Result<()> {
        for request in requests {
            writeln!(out, "{}", serde_json::to_string(request)?)?;
        }
        Ok(())
    }

    fn task_line(&self, task: &Task) -> String {
        let title = truncate(display_title(task), TITLE_WIDTH);
        let code = match task.canonical_status() {
            CanonicalStatus::Pending => "33",
            CanonicalStatus::InProgress => "34",
            CanonicalStatus::Completed => "32",
            CanonicalStatus::Cancelled => "90",
        };
        self.paint(&format!("• {title}"), code)
    }

    fn priority_badge(&self, priority: Priority) -> String {
        let code = match priority {
            Priority::Low => "32",
            Priority::Medium => "33",
            Priority::High => "35",
            Priority::Urgent => "31",
            Priority::Other => "2",
        };
        self.paint(priority.badge(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn display_title(task: &Task) -> &str {
    let title = task.title.trim();
    if title.is_empty() { task.id.as_str() } else { title }
}

fn truncate(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + 1 > max_width {
            break;
        }
        width += ch_width;
        out.push(ch);
    }
    out.push('…');
    out
}

/// Writes rows of multi-line cells under a header line. Every row is as tall
/// as its tallest cell.
fn write_grid<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<Vec<String>>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            for line in cell {
                widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(line).as_str()));
            }
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        let height = row.iter().map(Vec::len).max().unwrap_or(0);
        for line_idx in 0..height {
            for idx in 0..column_count {
                let line = row
                    .get(idx)
                    .and_then(|cell| cell.get(line_idx))
                    .map(String::as_str)
                    .unwrap_or("");
                let visible_width = UnicodeWidthStr::width(strip_ansi(line).as_str());
                let padding = widths[idx].saturating_sub(visible_width);
                write!(writer, "{}{} ", line, " ".repeat(padding))?;
            }
            writeln!(writer)?;
        }
    }

    Ok(())
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
