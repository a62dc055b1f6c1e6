use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::datetime::format_iso_day;
use crate::intent::Mutation;
use crate::task::Task;

/// A JSON array of tasks on disk, standing in for the planning REST API.
#[derive(Debug)]
pub struct TaskFile {
    pub path: PathBuf,
}

impl TaskFile {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> anyhow::Result<Vec<Task>> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "task file missing; starting empty");
            return Ok(vec![]);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(vec![]);
        }

        let tasks: Vec<Task> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse tasks in {}", self.path.display()))?;
        debug!(count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    #[tracing::instrument(skip(self, tasks), fields(path = %self.path.display(), count = tasks.len()))]
    pub fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let mut tmp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
        serde_json::to_writer_pretty(&mut tmp, tasks)?;
        writeln!(tmp)?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|e| anyhow!("failed to persist {}: {}", self.path.display(), e))?;

        info!("saved tasks");
        Ok(())
    }
}

/// Writes a mutation into the in-memory list the way the planning endpoint
/// does: dates as `YYYY-MM-DD`, status in wire form, progress when given.
#[tracing::instrument(skip(tasks, mutation), fields(task = %mutation.task_id()))]
pub fn apply_mutation(tasks: &mut [Task], mutation: &Mutation) -> anyhow::Result<()> {
    let task = tasks
        .iter_mut()
        .find(|task| &task.id == mutation.task_id())
        .ok_or_else(|| anyhow!("task not found: {}", mutation.task_id()))?;

    match mutation {
        Mutation::Reschedule(drop) => {
            task.start_date = Some(format_iso_day(drop.new_start));
            task.end_date = Some(format_iso_day(drop.new_end));
        }
        Mutation::Status(change) => {
            task.status = Some(change.status.as_wire().to_string());
            if let Some(progress) = change.progress {
                task.progress = i64::from(progress);
            }
        }
    }

    debug!("mutation applied to task list");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::*;
    use crate::intent::{StatusChange, TaskDrop};
    use crate::status::CanonicalStatus;
    use crate::task::TaskId;

    #[test]
    fn missing_file_loads_empty_and_save_round_trips() {
        let temp = tempdir().expect("tempdir");
        let file = TaskFile::new(&temp.path().join("nested").join("tasks.json"));
        assert!(file.load().expect("load missing").is_empty());

        let mut task = Task::new("t1", "Replanteo");
        task.start_date = Some("2024-03-05".to_string());
        file.save(&[task.clone()]).expect("save");

        assert_eq!(file.load().expect("reload"), vec![task]);
    }

    #[test]
    fn applies_status_and_reschedule() {
        let mut tasks = vec![Task::new("t1", "Replanteo")];
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date");

        apply_mutation(
            &mut tasks,
            &Mutation::Reschedule(TaskDrop {
                task_id: TaskId::from("t1"),
                new_start: date,
                new_end: date,
            }),
        )
        .expect("reschedule");
        apply_mutation(
            &mut tasks,
            &Mutation::Status(StatusChange {
                task_id: TaskId::from("t1"),
                status: CanonicalStatus::Completed,
                progress: Some(100),
            }),
        )
        .expect("status");

        assert_eq!(tasks[0].start_date.as_deref(), Some("2024-03-09"));
        assert_eq!(tasks[0].end_date.as_deref(), Some("2024-03-09"));
        assert_eq!(tasks[0].status.as_deref(), Some("COMPLETED"));
        assert_eq!(tasks[0].progress, 100);
    }

    #[test]
    fn unknown_task_is_an_error() {
        let mut tasks: Vec<Task> = vec![];
        let err = apply_mutation(
            &mut tasks,
            &Mutation::Status(StatusChange {
                task_id: TaskId::from("nope"),
                status: CanonicalStatus::Pending,
                progress: None,
            }),
        )
        .expect_err("missing task");
        assert!(err.to_string().contains("nope"));
    }
}
