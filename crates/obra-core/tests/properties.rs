use chrono::{Datelike, NaiveDate, Weekday};
use obra_core::datetime::{PlanningZone, days_in_month};
use obra_core::grid::{GridOptions, Placement, ViewMode, compute_grid};
use obra_core::kanban::group_by_status;
use obra_core::status::{CanonicalStatus, normalize};
use obra_core::task::{Schedule, Task};
use proptest::prelude::*;

fn options(placement: Placement) -> GridOptions {
    GridOptions {
        zone: PlanningZone::Named(chrono_tz::UTC),
        placement,
        ..GridOptions::default()
    }
}

fn any_date() -> impl Strategy<Value = NaiveDate> {
    (1990i32..2100, 1u32..=12, 1u32..=31).prop_map(|(year, month, day)| {
        let day = day.min(days_in_month(year, month));
        NaiveDate::from_ymd_opt(year, month, day).expect("clamped date is valid")
    })
}

fn any_task() -> impl Strategy<Value = Task> {
    (
        "[a-z0-9]{1,8}",
        proptest::option::of(prop_oneof![
            Just("in-progress".to_string()),
            Just("Completado".to_string()),
            Just("cancelled".to_string()),
            Just("pending".to_string()),
            "[a-zA-Z ]{0,12}",
        ]),
        proptest::option::of(any_date()),
        proptest::option::of(0i64..20),
        -20i64..140,
    )
        .prop_map(|(id, status, start, span, progress)| {
            let mut task = Task::new(id, "tarea");
            task.status = status;
            task.start_date = start.map(|date| date.format("%Y-%m-%d").to_string());
            task.end_date = start
                .zip(span)
                .map(|(date, span)| (date + chrono::Duration::days(span)).format("%Y-%m-%d").to_string());
            task.progress = progress;
            task
        })
}

proptest! {
    #[test]
    fn fragments_decide_status(prefix in "[a-z ]{0,6}", suffix in "[a-z ]{0,6}") {
        let progress = format!("{prefix}PROGRESS{suffix}");
        prop_assert_eq!(normalize(Some(&progress)), CanonicalStatus::InProgress);

        let plain = format!("{prefix}{suffix}");
        prop_assume!(!plain.contains("progress") && !plain.contains("complet") && !plain.contains("cancel"));
        prop_assert_eq!(normalize(Some(&plain)), CanonicalStatus::Pending);
    }

    #[test]
    fn complet_and_cancel_fragments(word in "[a-z]{0,5}") {
        prop_assume!(!word.contains("progress"));
        prop_assert_eq!(normalize(Some(&format!("{word}Complet"))), CanonicalStatus::Completed);
        prop_assume!(!format!("{word}cancel").contains("complet"));
        prop_assert_eq!(normalize(Some(&format!("{word}Cancel"))), CanonicalStatus::Cancelled);
    }

    #[test]
    fn grouping_is_a_partition(tasks in proptest::collection::vec(any_task(), 0..30)) {
        let board = group_by_status(&tasks);
        prop_assert_eq!(board.iter().count(), 4);
        prop_assert_eq!(board.len(), tasks.len());

        for (status, column) in board.iter() {
            for task in column {
                prop_assert_eq!(task.canonical_status(), status);
            }
        }

        let mut grouped = board
            .iter()
            .flat_map(|(_, column)| column.iter().map(|task| *task as *const Task))
            .collect::<Vec<_>>();
        let mut input = tasks.iter().map(|task| task as *const Task).collect::<Vec<_>>();
        grouped.sort();
        input.sort();
        prop_assert_eq!(grouped, input);
    }

    #[test]
    fn month_grid_is_whole_weeks_covering_the_month(reference in any_date(), sunday in any::<bool>()) {
        let opts = GridOptions {
            week_start: if sunday { Weekday::Sun } else { Weekday::Mon },
            ..options(Placement::StartDay)
        };
        let grid = compute_grid(reference, ViewMode::Month, &[], &opts);

        prop_assert_eq!(grid.cells.len() % 7, 0);
        prop_assert_eq!(grid.cells[0].date.weekday(), opts.week_start);

        let in_month = grid.cells.iter().filter(|cell| cell.is_current_month).collect::<Vec<_>>();
        prop_assert_eq!(in_month.len() as u32, days_in_month(reference.year(), reference.month()));
        for (idx, cell) in in_month.iter().enumerate() {
            prop_assert_eq!(cell.date.day() as usize, idx + 1);
            prop_assert_eq!(cell.date.month(), reference.month());
        }
    }

    #[test]
    fn week_grid_is_seven_days_from_monday(reference in any_date()) {
        let grid = compute_grid(reference, ViewMode::Week, &[], &options(Placement::StartDay));
        prop_assert_eq!(grid.cells.len(), 7);
        prop_assert_eq!(grid.cells[0].date.weekday(), Weekday::Mon);
        prop_assert!(grid.cells.iter().any(|cell| cell.date == reference));
        for pair in grid.cells.windows(2) {
            prop_assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date));
        }
    }

    #[test]
    fn grid_is_idempotent_and_start_day_places_once(
        reference in any_date(),
        week in any::<bool>(),
        tasks in proptest::collection::vec(any_task(), 0..20),
    ) {
        let mode = if week { ViewMode::Week } else { ViewMode::Month };
        let opts = options(Placement::StartDay);
        let first = compute_grid(reference, mode, &tasks, &opts);
        let second = compute_grid(reference, mode, &tasks, &opts);
        prop_assert_eq!(&first, &second);

        let first_day = first.cells[0].date;
        let last_day = first.cells[first.cells.len() - 1].date;
        for task in &tasks {
            let hits = first
                .cells
                .iter()
                .filter(|cell| cell.tasks.iter().any(|placed| std::ptr::eq(*placed, task)))
                .map(|cell| cell.date)
                .collect::<Vec<_>>();
            match task.schedule(opts.zone, false).anchor() {
                Some(anchor) if anchor >= first_day && anchor <= last_day => {
                    prop_assert_eq!(hits, vec![anchor]);
                }
                _ => prop_assert!(hits.is_empty()),
            }
        }
    }

    #[test]
    fn span_placement_covers_every_day_in_range(
        reference in any_date(),
        tasks in proptest::collection::vec(any_task(), 0..20),
    ) {
        let opts = options(Placement::Span);
        let grid = compute_grid(reference, ViewMode::Month, &tasks, &opts);

        for task in &tasks {
            let range = match task.schedule(opts.zone, false) {
                Schedule::Scheduled { start, end } => {
                    Some((start, end.filter(|end| *end > start).unwrap_or(start)))
                }
                Schedule::Unscheduled => None,
            };
            for cell in &grid.cells {
                let placed = cell.tasks.iter().any(|placed| std::ptr::eq(*placed, task));
                let expected = range.is_some_and(|(start, last)| cell.date >= start && cell.date <= last);
                prop_assert_eq!(placed, expected, "task {} on {}", task.id, cell.date);
            }
        }
    }
}
