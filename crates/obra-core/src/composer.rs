//! Gesture routing for the planning view.
//!
//! [`ViewComposer`] holds no state of its own. Everything that changes
//! between gestures (reference date, view mode, drag slot, selection, editor)
//! lives in a caller-owned [`ViewState`], and every outcome that needs the
//! outside world is reported through a [`PlanningHandler`].

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::PlannerSettings;
use crate::datetime::format_iso_day;
use crate::drag::DragController;
use crate::grid::{CalendarGrid, ViewMode, compute_grid};
use crate::intent::{Intent, Mutation, StatusChange, StatusOptions, TaskDrop};
use crate::kanban::{KanbanBoard, group_by_status};
use crate::status::CanonicalStatus;
use crate::task::{Task, TaskId};

/// Callbacks supplied by the page-level caller.
pub trait PlanningHandler {
    fn on_task_click(&mut self, task: &Task);

    /// `date_str` is an ISO `YYYY-MM-DD` day.
    fn on_date_click(&mut self, date_str: &str);

    fn on_task_drop(&mut self, drop: TaskDrop);

    fn on_status_change(
        &mut self,
        task_id: &TaskId,
        status: CanonicalStatus,
        opts: Option<StatusOptions>,
    );

    fn on_edit(&mut self, _task: &Task) {}

    fn on_create(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Editor {
    Closed,
    Editing(TaskId),
    Creating { date: Option<NaiveDate> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub reference: NaiveDate,
    pub mode: ViewMode,
    pub drag: DragController,
    pub selected: Option<TaskId>,
    pub editor: Editor,
}

impl ViewState {
    pub fn new(reference: NaiveDate, mode: ViewMode) -> Self {
        Self {
            reference,
            mode,
            drag: DragController::new(),
            selected: None,
            editor: Editor::Closed,
        }
    }

    pub fn prev(&mut self) {
        self.reference = self.mode.shift(self.reference, -1);
    }

    pub fn next(&mut self) {
        self.reference = self.mode.shift(self.reference, 1);
    }

    pub fn today(&mut self, today: NaiveDate) {
        self.reference = today;
    }

    pub fn toggle_view_mode(&mut self) {
        self.mode = self.mode.toggled();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "gesture", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Gesture {
    ClickDay { date: NaiveDate },
    ClickTask { task_id: TaskId },
    DragStart { task_id: TaskId },
    DropOnDay { date: NaiveDate },
    DropOnColumn { status: CanonicalStatus },
    DragEnd,
    ToggleCheckbox { task_id: TaskId },
    Edit { task_id: TaskId },
    Create,
    Prev,
    Next,
    Today,
    ToggleViewMode,
}

pub struct ViewComposer<'a> {
    tasks: &'a [Task],
    settings: &'a PlannerSettings,
}

impl<'a> ViewComposer<'a> {
    pub fn new(tasks: &'a [Task], settings: &'a PlannerSettings) -> Self {
        Self { tasks, settings }
    }

    pub fn calendar(&self, state: &ViewState) -> CalendarGrid<'a> {
        compute_grid(
            state.reference,
            state.mode,
            self.tasks,
            &self.settings.grid_options(),
        )
    }

    pub fn board(&self) -> KanbanBoard<'a> {
        group_by_status(self.tasks)
    }

    fn find(&self, task_id: &TaskId) -> Option<&'a Task> {
        let found = self.tasks.iter().find(|task| &task.id == task_id);
        if found.is_none() {
            warn!(task = %task_id, "gesture references unknown task; ignoring");
        }
        found
    }

    #[tracing::instrument(skip(self, state, handler))]
    pub fn dispatch<H: PlanningHandler>(
        &self,
        state: &mut ViewState,
        gesture: Gesture,
        today: NaiveDate,
        handler: &mut H,
    ) {
        match gesture {
            Gesture::ClickDay { date } => {
                state.editor = Editor::Creating { date: Some(date) };
                handler.on_date_click(&format_iso_day(date));
            }
            Gesture::ClickTask { task_id } => {
                if let Some(task) = self.find(&task_id) {
                    state.selected = Some(task.id.clone());
                    handler.on_task_click(task);
                }
            }
            Gesture::DragStart { task_id } => {
                if let Some(task) = self.find(&task_id) {
                    state.drag.start(task.id.clone());
                }
            }
            Gesture::DropOnDay { date } => {
                if let Some(drop) = state.drag.drop_on_day(
                    date,
                    self.tasks,
                    self.settings.zone,
                    self.settings.preserve_duration,
                ) {
                    handler.on_task_drop(drop);
                }
            }
            Gesture::DropOnColumn { status } => {
                if let Some(change) = state.drag.drop_on_column(status) {
                    emit_status(handler, change);
                }
            }
            Gesture::DragEnd => state.drag.cancel(),
            Gesture::ToggleCheckbox { task_id } => {
                if let Some(task) = self.find(&task_id) {
                    emit_status(handler, DragController::toggle_completion(task));
                }
            }
            Gesture::Edit { task_id } => {
                if let Some(task) = self.find(&task_id) {
                    state.editor = Editor::Editing(task.id.clone());
                    handler.on_edit(task);
                }
            }
            Gesture::Create => {
                state.editor = Editor::Creating { date: None };
                handler.on_create();
            }
            Gesture::Prev => state.prev(),
            Gesture::Next => state.next(),
            Gesture::Today => state.today(today),
            Gesture::ToggleViewMode => state.toggle_view_mode(),
        }

        debug!(reference = %state.reference, mode = state.mode.as_key(), "view state after gesture");
    }
}

fn emit_status<H: PlanningHandler>(handler: &mut H, change: StatusChange) {
    let opts = change.options();
    handler.on_status_change(&change.task_id, change.status, opts);
}

/// A handler that records every callback as an [`Intent`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IntentRecorder {
    pub intents: Vec<Intent>,
}

impl IntentRecorder {
    pub fn mutations(&self) -> impl Iterator<Item = &Mutation> {
        self.intents.iter().filter_map(Intent::mutation)
    }
}

impl PlanningHandler for IntentRecorder {
    fn on_task_click(&mut self, task: &Task) {
        self.intents.push(Intent::Open {
            task_id: task.id.clone(),
        });
    }

    fn on_date_click(&mut self, date_str: &str) {
        match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            Ok(date) => self.intents.push(Intent::CreateOn { date }),
            Err(error) => warn!(date_str, %error, "date click with malformed day"),
        }
    }

    fn on_task_drop(&mut self, drop: TaskDrop) {
        self.intents.push(Intent::Update(Mutation::Reschedule(drop)));
    }

    fn on_status_change(
        &mut self,
        task_id: &TaskId,
        status: CanonicalStatus,
        opts: Option<StatusOptions>,
    ) {
        self.intents.push(Intent::Update(Mutation::Status(StatusChange {
            task_id: task_id.clone(),
            status,
            progress: opts.map(|opts| opts.progress),
        })));
    }

    fn on_edit(&mut self, task: &Task) {
        self.intents.push(Intent::Edit {
            task_id: task.id.clone(),
        });
    }

    fn on_create(&mut self) {
        self.intents.push(Intent::Create);
    }
}
