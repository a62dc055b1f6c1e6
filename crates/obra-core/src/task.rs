use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::datetime::{PlanningZone, parse_task_day};
use crate::status::{CanonicalStatus, normalize};

pub const UNASSIGNED_LABEL: &str = "Sin asignar";
pub const NO_PROJECT_LABEL: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

// Ids come from a REST API that mixes numeric and string keys.
impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => TaskId(text),
            RawId::Number(number) => TaskId(number.to_string()),
        })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// A bad progress value degrades to 0 instead of failing the whole file.
// Fractions truncate toward zero; numeric strings are accepted.
fn lenient_progress<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let progress = match &raw {
        serde_json::Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|value| value.is_finite()).map(|value| value as i64)),
        serde_json::Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(|value| value as i64),
        _ => None,
    };
    if progress.is_none() && !raw.is_null() {
        tracing::warn!(value = %raw, "unreadable progress; using 0");
    }
    Ok(progress.unwrap_or(0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
    Other,
}

impl Priority {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_uppercase()).as_deref() {
            Some("LOW") => Priority::Low,
            Some("MEDIUM") => Priority::Medium,
            Some("HIGH") => Priority::High,
            Some("URGENT") => Priority::Urgent,
            _ => Priority::Other,
        }
    }

    pub fn badge(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
            Priority::Other => "-",
        }
    }
}

/// Where a task sits in time, once its raw date fields have been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Unscheduled,
    Scheduled {
        start: NaiveDate,
        end: Option<NaiveDate>,
    },
}

impl Schedule {
    pub fn anchor(&self) -> Option<NaiveDate> {
        match self {
            Schedule::Unscheduled => None,
            Schedule::Scheduled { start, .. } => Some(*start),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, deserialize_with = "lenient_progress")]
    pub progress: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub external_links: Vec<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: TaskId(id.into()),
            title: title.into(),
            status: None,
            start_date: None,
            end_date: None,
            created_at: None,
            progress: 0,
            priority: None,
            assignee: None,
            project: None,
            external_links: vec![],
            extra: BTreeMap::new(),
        }
    }

    pub fn canonical_status(&self) -> CanonicalStatus {
        normalize(self.status.as_deref())
    }

    pub fn priority(&self) -> Priority {
        Priority::parse(self.priority.as_deref())
    }

    /// Resolves the placement window. The anchor is the start date, or the
    /// end date when only that is present, or (when `created_fallback` is
    /// set) the creation date.
    pub fn schedule(&self, zone: PlanningZone, created_fallback: bool) -> Schedule {
        let start = self.resolve_day("startDate", self.start_date.as_deref(), zone);
        let end = self.resolve_day("endDate", self.end_date.as_deref(), zone);

        match (start, end) {
            (Some(start), end) => Schedule::Scheduled { start, end },
            (None, Some(end)) => Schedule::Scheduled {
                start: end,
                end: Some(end),
            },
            (None, None) if created_fallback => {
                match self.resolve_day("createdAt", self.created_at.as_deref(), zone) {
                    Some(created) => Schedule::Scheduled {
                        start: created,
                        end: None,
                    },
                    None => Schedule::Unscheduled,
                }
            }
            (None, None) => Schedule::Unscheduled,
        }
    }

    pub fn assignee_label(&self) -> &str {
        non_blank(self.assignee.as_deref()).unwrap_or(UNASSIGNED_LABEL)
    }

    pub fn project_label(&self) -> &str {
        non_blank(self.project.as_deref()).unwrap_or(NO_PROJECT_LABEL)
    }

    fn resolve_day(&self, field: &str, raw: Option<&str>, zone: PlanningZone) -> Option<NaiveDate> {
        let raw = non_blank(raw)?;
        let day = parse_task_day(raw, zone);
        if day.is_none() {
            tracing::warn!(task = %self.id, field, raw, "unparseable date; treating as absent");
        }
        day
    }
}

/// Progress as a display percentage. The stored value is left untouched.
pub fn clamp_progress(progress: i64) -> u8 {
    progress.clamp(0, 100) as u8
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}
