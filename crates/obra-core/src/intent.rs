use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Value, json};

use crate::datetime::format_iso_day;
use crate::status::CanonicalStatus;
use crate::task::TaskId;

/// A calendar drop: the task moves to a new date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDrop {
    pub task_id: TaskId,
    pub new_start: NaiveDate,
    pub new_end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusOptions {
    pub progress: u8,
}

/// A column drop or checkbox toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub task_id: TaskId,
    pub status: CanonicalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl StatusChange {
    pub fn options(&self) -> Option<StatusOptions> {
        self.progress.map(|progress| StatusOptions { progress })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Mutation {
    Reschedule(TaskDrop),
    Status(StatusChange),
}

impl Mutation {
    pub fn task_id(&self) -> &TaskId {
        match self {
            Mutation::Reschedule(drop) => &drop.task_id,
            Mutation::Status(change) => &change.task_id,
        }
    }

    pub fn same_kind(&self, other: &Mutation) -> bool {
        matches!(
            (self, other),
            (Mutation::Reschedule(_), Mutation::Reschedule(_))
                | (Mutation::Status(_), Mutation::Status(_))
        )
    }

    /// Folds an older queued mutation of the same kind into this one. A status
    /// change without progress keeps the progress the older one carried, so
    /// the merged request persists what sending both in order would have.
    pub fn coalesce(self, older: Mutation) -> Mutation {
        match (self, older) {
            (Mutation::Status(mut newer), Mutation::Status(older)) => {
                newer.progress = newer.progress.or(older.progress);
                Mutation::Status(newer)
            }
            (newer, _) => newer,
        }
    }

    /// The HTTP request the page-level caller issues for this mutation.
    pub fn request(&self) -> UpdateRequest {
        let body = match self {
            Mutation::Reschedule(drop) => json!({
                "startDate": format_iso_day(drop.new_start),
                "endDate": format_iso_day(drop.new_end),
            }),
            Mutation::Status(change) => {
                let mut body = json!({ "status": change.status.as_wire() });
                if let (Some(progress), Value::Object(map)) = (change.progress, &mut body) {
                    map.insert("progress".to_string(), json!(progress));
                }
                body
            }
        };

        UpdateRequest {
            method: "PUT",
            path: format!("/api/planning/{}", self.task_id()),
            body,
        }
    }
}

/// Everything the view can ask its caller to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "intent", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Intent {
    Open { task_id: TaskId },
    CreateOn { date: NaiveDate },
    Edit { task_id: TaskId },
    Create,
    Update(Mutation),
}

impl Intent {
    pub fn mutation(&self) -> Option<&Mutation> {
        match self {
            Intent::Update(mutation) => Some(mutation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Value,
}
