use std::collections::BTreeMap;

use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};

use crate::datetime::{
  PlanningZone,
  add_days,
  end_of_week,
  first_day_of_month,
  last_day_of_month,
  shift_months,
  start_of_week
};
use crate::status::CanonicalStatus;
use crate::task::{
  Schedule,
  Task
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum ViewMode {
  Month,
  Week
}

impl ViewMode {
  #[must_use]
  pub fn toggled(self) -> Self {
    match self {
      | ViewMode::Month => ViewMode::Week,
      | ViewMode::Week => ViewMode::Month
    }
  }

  /// Tasks rendered inline per cell
  /// before the overflow counter.
  #[must_use]
  pub fn display_cap(self) -> usize {
    match self {
      | ViewMode::Month => 3,
      | ViewMode::Week => 5
    }
  }

  pub fn from_key(
    raw: &str
  ) -> Option<Self> {
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "month" | "mes" => {
        Some(ViewMode::Month)
      }
      | "week" | "semana" => {
        Some(ViewMode::Week)
      }
      | _ => None
    }
  }

  #[must_use]
  pub fn as_key(self) -> &'static str {
    match self {
      | ViewMode::Month => "month",
      | ViewMode::Week => "week"
    }
  }

  /// Moves the reference date one period
  /// forward (`step > 0`) or back.
  #[must_use]
  pub fn shift(
    self,
    reference: NaiveDate,
    step: i32
  ) -> NaiveDate {
    match self {
      | ViewMode::Month => {
        shift_months(reference, step)
      }
      | ViewMode::Week => {
        add_days(
          reference,
          i64::from(step) * 7
        )
      }
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Placement {
  /// A task shows up once, on its
  /// anchor day.
  StartDay,
  /// A task shows up on every day from
  /// its start to its end.
  Span
}

impl Placement {
  pub fn from_key(
    raw: &str
  ) -> Option<Self> {
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "start" | "start-day" => {
        Some(Placement::StartDay)
      }
      | "span" | "range" => {
        Some(Placement::Span)
      }
      | _ => None
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOptions {
  pub week_start:       Weekday,
  pub placement:        Placement,
  pub zone:             PlanningZone,
  pub created_fallback: bool
}

impl Default for GridOptions {
  fn default() -> Self {
    Self {
      week_start:       Weekday::Mon,
      placement:
        Placement::StartDay,
      zone:             PlanningZone::Local,
      created_fallback: false
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell<'a> {
  pub date:             NaiveDate,
  pub is_current_month: bool,
  pub tasks:            Vec<&'a Task>
}

impl<'a> DayCell<'a> {
  /// Splits the cell's tasks into the
  /// inline slice and the number hidden
  /// behind the overflow counter.
  #[must_use]
  pub fn visible(
    &self,
    cap: usize
  ) -> (&[&'a Task], usize) {
    let shown = self.tasks.len().min(cap);
    (
      &self.tasks[..shown],
      self.tasks.len() - shown
    )
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarGrid<'a> {
  pub mode:      ViewMode,
  pub reference: NaiveDate,
  pub cells:     Vec<DayCell<'a>>
}

impl<'a> CalendarGrid<'a> {
  pub fn weeks(
    &self
  ) -> impl Iterator<Item = &[DayCell<'a>]>
  {
    self.cells.chunks(7)
  }

  #[must_use]
  pub fn cell(
    &self,
    date: NaiveDate
  ) -> Option<&DayCell<'a>> {
    self
      .cells
      .iter()
      .find(|cell| cell.date == date)
  }
}

/// First and last day of the period the
/// view is about: the whole month, or the
/// week holding the reference date.
#[must_use]
pub fn calendar_window(
  mode: ViewMode,
  reference: NaiveDate,
  week_start: Weekday
) -> (NaiveDate, NaiveDate) {
  match mode {
    | ViewMode::Month => {
      (
        first_day_of_month(
          reference.year(),
          reference.month()
        ),
        last_day_of_month(
          reference.year(),
          reference.month()
        )
      )
    }
    | ViewMode::Week => {
      let start = start_of_week(
        reference, week_start
      );
      (start, add_days(start, 6))
    }
  }
}

fn grid_bounds(
  mode: ViewMode,
  reference: NaiveDate,
  week_start: Weekday
) -> (NaiveDate, NaiveDate) {
  let (first, last) = calendar_window(
    mode, reference, week_start
  );
  (
    start_of_week(first, week_start),
    end_of_week(last, week_start)
  )
}

/// Builds the day cells for the view and
/// places every scheduled task on them.
#[tracing::instrument(skip(tasks, options), fields(task_count = tasks.len()))]
pub fn compute_grid<'a>(
  reference: NaiveDate,
  mode: ViewMode,
  tasks: &'a [Task],
  options: &GridOptions
) -> CalendarGrid<'a> {
  let (grid_start, grid_end) =
    grid_bounds(
      mode,
      reference,
      options.week_start
    );

  let mut cells = Vec::new();
  let mut day = grid_start;
  while day <= grid_end {
    cells.push(DayCell {
      date:             day,
      is_current_month: day.year()
        == reference.year()
        && day.month()
          == reference.month(),
      tasks:            Vec::new()
    });
    let next = add_days(day, 1);
    if next == day {
      break;
    }
    day = next;
  }

  let mut unscheduled = 0_usize;
  for task in tasks {
    let schedule = task.schedule(
      options.zone,
      options.created_fallback
    );
    let Schedule::Scheduled {
      start,
      end
    } = schedule
    else {
      unscheduled += 1;
      continue;
    };

    let last = match options.placement {
      | Placement::StartDay => start,
      | Placement::Span => {
        end
          .filter(|end| *end > start)
          .unwrap_or(start)
      }
    };

    if last < grid_start
      || start > grid_end
    {
      continue;
    }

    let from = start.max(grid_start);
    let to = last.min(grid_end);
    let offset = (from - grid_start)
      .num_days()
      as usize;
    let span =
      (to - from).num_days() as usize;
    for cell in cells
      .iter_mut()
      .skip(offset)
      .take(span + 1)
    {
      cell.tasks.push(task);
    }
  }

  tracing::debug!(
    mode = mode.as_key(),
    %grid_start,
    %grid_end,
    cells = cells.len(),
    unscheduled,
    "calendar grid computed"
  );

  CalendarGrid {
    mode,
    reference,
    cells
  }
}

/// Counts tasks per status whose anchor
/// falls inside the displayed period.
#[must_use]
pub fn summarize_period(
  tasks: &[Task],
  mode: ViewMode,
  reference: NaiveDate,
  options: &GridOptions
) -> BTreeMap<CanonicalStatus, usize> {
  let (start, end) = calendar_window(
    mode,
    reference,
    options.week_start
  );
  let mut counts = CanonicalStatus::ALL
    .iter()
    .map(|status| (*status, 0_usize))
    .collect::<BTreeMap<_, _>>();

  for task in tasks {
    let Some(anchor) = task
      .schedule(
        options.zone,
        options.created_fallback
      )
      .anchor()
    else {
      continue;
    };
    if anchor < start || anchor > end {
      continue;
    }
    *counts
      .entry(task.canonical_status())
      .or_default() += 1;
  }

  counts
}

#[must_use]
pub fn calendar_title(
  mode: ViewMode,
  reference: NaiveDate,
  week_start: Weekday
) -> String {
  match mode {
    | ViewMode::Month => {
      format!(
        "Month View {}",
        reference.format("%B %Y")
      )
    }
    | ViewMode::Week => {
      let (start, end) =
        calendar_window(
          mode, reference, week_start
        );
      format!(
        "Week View {} - {}",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
      )
    }
  }
}

#[must_use]
pub fn weekday_labels(
  week_start: Weekday
) -> Vec<&'static str> {
  let mut day = week_start;
  let mut labels = Vec::with_capacity(7);
  for _ in 0..7 {
    labels.push(match day {
      | Weekday::Mon => "Mon",
      | Weekday::Tue => "Tue",
      | Weekday::Wed => "Wed",
      | Weekday::Thu => "Thu",
      | Weekday::Fri => "Fri",
      | Weekday::Sat => "Sat",
      | Weekday::Sun => "Sun"
    });
    day = day.succ();
  }
  labels
}
