use chrono::NaiveDate;
use tracing::{
  debug,
  info
};

use crate::datetime::{
  PlanningZone,
  add_days
};
use crate::intent::{
  StatusChange,
  TaskDrop
};
use crate::kanban::is_complete;
use crate::status::CanonicalStatus;
use crate::task::{
  Schedule,
  Task,
  TaskId
};

/// Tracks the one task being dragged.
///
/// There is a single slot: starting a new
/// drag replaces whatever was there, and
/// every drop empties it. Nothing here
/// validates the destination or touches
/// the task list; the emitted change is
/// handed to the caller as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragController {
  dragged: Option<TaskId>
}

impl DragController {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  pub fn start(
    &mut self,
    task_id: TaskId
  ) {
    if let Some(previous) =
      self.dragged.as_ref()
    {
      debug!(
        %previous,
        next = %task_id,
        "drag slot overwritten"
      );
    }
    debug!(task = %task_id, "drag start");
    self.dragged = Some(task_id);
  }

  pub fn cancel(&mut self) {
    if let Some(task_id) =
      self.dragged.take()
    {
      debug!(task = %task_id, "drag end without drop");
    }
  }

  #[must_use]
  pub fn dragged(
    &self
  ) -> Option<&TaskId> {
    self.dragged.as_ref()
  }

  /// Dropping onto a column. Moving into
  /// `Completed` also sets progress to
  /// 100.
  pub fn drop_on_column(
    &mut self,
    status: CanonicalStatus
  ) -> Option<StatusChange> {
    let Some(task_id) =
      self.dragged.take()
    else {
      debug!(
        %status,
        "column drop with nothing dragged"
      );
      return None;
    };

    let progress = (status
      == CanonicalStatus::Completed)
      .then_some(100);
    info!(
      task = %task_id,
      %status,
      ?progress,
      "column drop"
    );
    Some(StatusChange {
      task_id,
      status,
      progress
    })
  }

  /// Dropping onto a day cell. Both ends
  /// collapse onto `date` unless
  /// `preserve_duration` is set, in which
  /// case the end keeps the task's
  /// original day span.
  pub fn drop_on_day(
    &mut self,
    date: NaiveDate,
    tasks: &[Task],
    zone: PlanningZone,
    preserve_duration: bool
  ) -> Option<TaskDrop> {
    let Some(task_id) =
      self.dragged.take()
    else {
      debug!(
        %date,
        "day drop with nothing dragged"
      );
      return None;
    };

    let span_days = if preserve_duration
    {
      tasks
        .iter()
        .find(|task| task.id == task_id)
        .map(|task| {
          match task
            .schedule(zone, false)
          {
            | Schedule::Scheduled {
              start,
              end: Some(end)
            } if end > start => {
              (end - start).num_days()
            }
            | _ => 0
          }
        })
        .unwrap_or(0)
    } else {
      0
    };

    let new_end =
      add_days(date, span_days);
    info!(
      task = %task_id,
      new_start = %date,
      %new_end,
      "day drop"
    );
    Some(TaskDrop {
      task_id,
      new_start: date,
      new_end
    })
  }

  /// A checkbox click: complete tasks go
  /// back to pending at 0%, everything
  /// else is completed at 100%. Does not
  /// touch the drag slot.
  #[must_use]
  pub fn toggle_completion(
    task: &Task
  ) -> StatusChange {
    let (status, progress) =
      if is_complete(task) {
        (CanonicalStatus::Pending, 0)
      } else {
        (CanonicalStatus::Completed, 100)
      };
    StatusChange {
      task_id: task.id.clone(),
      status,
      progress: Some(progress)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn utc() -> PlanningZone {
    PlanningZone::Named(chrono_tz::UTC)
  }

  #[test]
  fn column_drop_to_completed_sets_full_progress(
  ) {
    let mut drag = DragController::new();
    drag.start(TaskId::from("t1"));
    let change = drag
      .drop_on_column(
        CanonicalStatus::Completed
      )
      .expect("status change");
    assert_eq!(
      change,
      StatusChange {
        task_id:  TaskId::from("t1"),
        status:
          CanonicalStatus::Completed,
        progress: Some(100)
      }
    );
    assert_eq!(drag.dragged(), None);
  }

  #[test]
  fn column_drop_elsewhere_leaves_progress_alone(
  ) {
    let mut drag = DragController::new();
    drag.start(TaskId::from("t1"));
    let change = drag
      .drop_on_column(
        CanonicalStatus::Cancelled
      )
      .expect("status change");
    assert_eq!(change.progress, None);
  }

  #[test]
  fn drop_without_drag_emits_nothing() {
    let mut drag = DragController::new();
    assert!(
      drag
        .drop_on_column(
          CanonicalStatus::Pending
        )
        .is_none()
    );
    assert!(
      drag
        .drop_on_day(
          date(2024, 3, 1),
          &[],
          utc(),
          false
        )
        .is_none()
    );
  }

  #[test]
  fn new_drag_overwrites_slot() {
    let mut drag = DragController::new();
    drag.start(TaskId::from("a"));
    drag.start(TaskId::from("b"));
    assert_eq!(
      drag.dragged(),
      Some(&TaskId::from("b"))
    );
    drag.cancel();
    assert_eq!(drag.dragged(), None);
  }

  #[test]
  fn day_drop_collapses_range_by_default()
  {
    let mut task =
      Task::new("t1", "Muro");
    task.start_date =
      Some("2024-03-04".to_string());
    task.end_date =
      Some("2024-03-08".to_string());
    let tasks = vec![task];

    let mut drag = DragController::new();
    drag.start(TaskId::from("t1"));
    let dropped = drag
      .drop_on_day(
        date(2024, 3, 11),
        &tasks,
        utc(),
        false
      )
      .expect("task drop");
    assert_eq!(
      dropped.new_start,
      date(2024, 3, 11)
    );
    assert_eq!(
      dropped.new_end,
      date(2024, 3, 11)
    );

    drag.start(TaskId::from("t1"));
    let kept = drag
      .drop_on_day(
        date(2024, 3, 11),
        &tasks,
        utc(),
        true
      )
      .expect("task drop");
    assert_eq!(
      kept.new_end,
      date(2024, 3, 15)
    );
  }

  #[test]
  fn checkbox_toggle_follows_completion_or(
  ) {
    let mut task =
      Task::new("t1", "Solera");
    task.status =
      Some("PENDING".to_string());
    task.progress = 100;
    let reopen =
      DragController::toggle_completion(
        &task
      );
    assert_eq!(
      reopen.status,
      CanonicalStatus::Pending
    );
    assert_eq!(reopen.progress, Some(0));

    task.progress = 20;
    let finish =
      DragController::toggle_completion(
        &task
      );
    assert_eq!(
      finish.status,
      CanonicalStatus::Completed
    );
    assert_eq!(
      finish.progress,
      Some(100)
    );
  }
}
