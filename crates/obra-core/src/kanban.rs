use std::collections::BTreeMap;

use crate::status::CanonicalStatus;
use crate::task::Task;

/// Tasks partitioned into the four status columns.
#[derive(Debug, Clone, PartialEq)]
pub struct KanbanBoard<'a> {
    columns: BTreeMap<CanonicalStatus, Vec<&'a Task>>,
}

impl<'a> KanbanBoard<'a> {
    pub fn column(&self, status: CanonicalStatus) -> &[&'a Task] {
        self.columns
            .get(&status)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalStatus, &[&'a Task])> {
        self.columns
            .iter()
            .map(|(status, tasks)| (*status, tasks.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_map(self) -> BTreeMap<CanonicalStatus, Vec<&'a Task>> {
        self.columns
    }
}

#[tracing::instrument(skip_all, fields(task_count = tasks.len()))]
pub fn group_by_status(tasks: &[Task]) -> KanbanBoard<'_> {
    let mut columns = CanonicalStatus::ALL
        .iter()
        .map(|status| (*status, Vec::new()))
        .collect::<BTreeMap<_, _>>();

    for task in tasks {
        columns
            .entry(task.canonical_status())
            .or_insert_with(Vec::new)
            .push(task);
    }

    tracing::debug!(
        pending = columns[&CanonicalStatus::Pending].len(),
        in_progress = columns[&CanonicalStatus::InProgress].len(),
        completed = columns[&CanonicalStatus::Completed].len(),
        cancelled = columns[&CanonicalStatus::Cancelled].len(),
        "kanban columns grouped"
    );

    KanbanBoard { columns }
}

/// Whether the card's checkbox renders ticked. Independent of the column the
/// card sits in: a pending task at 100% shows ticked under Pending.
pub fn is_complete(task: &Task) -> bool {
    task.canonical_status() == CanonicalStatus::Completed || task.progress >= 100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, status: Option<&str>) -> Task {
        let mut task = Task::new(id, id);
        task.status = status.map(str::to_string);
        task
    }

    #[test]
    fn empty_list_still_has_four_columns() {
        let board = group_by_status(&[]);
        assert_eq!(board.iter().count(), 4);
        assert!(board.is_empty());
        assert_eq!(
            board.iter().map(|(status, _)| status).collect::<Vec<_>>(),
            CanonicalStatus::ALL.to_vec()
        );
    }

    #[test]
    fn partition_keeps_input_order() {
        let tasks = vec![
            task("a", Some("pending")),
            task("b", Some("IN_PROGRESS")),
            task("c", None),
            task("d", Some("in progress")),
            task("e", Some("Cancelado")),
        ];
        let board = group_by_status(&tasks);

        let ids = |status| {
            board
                .column(status)
                .iter()
                .map(|task| task.id.as_str())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(CanonicalStatus::Pending), vec!["a", "c"]);
        assert_eq!(ids(CanonicalStatus::InProgress), vec!["b", "d"]);
        assert_eq!(ids(CanonicalStatus::Cancelled), vec!["e"]);
        assert!(ids(CanonicalStatus::Completed).is_empty());
        assert_eq!(board.len(), tasks.len());
    }

    #[test]
    fn full_progress_ticks_checkbox_without_moving_column() {
        let mut done_by_progress = task("p", Some("PENDING"));
        done_by_progress.progress = 100;
        let tasks = vec![done_by_progress];

        let board = group_by_status(&tasks);
        assert_eq!(board.column(CanonicalStatus::Pending).len(), 1);
        assert!(is_complete(&tasks[0]));
        assert!(is_complete(&task("c", Some("completed"))));
        assert!(!is_complete(&task("n", Some("in-progress"))));
    }
}
