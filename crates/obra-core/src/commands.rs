use std::fs;
use std::io;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::cli::{ApplyArgs, Command};
use crate::composer::{Gesture, IntentRecorder, ViewComposer, ViewState};
use crate::config::PlannerSettings;
use crate::grid::{ViewMode, summarize_period};
use crate::intent::UpdateRequest;
use crate::queue::UpdateQueue;
use crate::render::Renderer;
use crate::status::{normalize, recognize};
use crate::store::{TaskFile, apply_mutation};
use crate::task::{Task, TaskId};

/// Runs one subcommand against the task file. `today` is the current day in
/// the planning zone; `reference` is the day the view is anchored to.
#[instrument(skip(store, settings, renderer, command))]
pub fn dispatch(
    store: &TaskFile,
    settings: &PlannerSettings,
    renderer: &Renderer,
    command: Command,
    reference: NaiveDate,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let tasks = store.load()?;
    let composer = ViewComposer::new(&tasks, settings);
    let mut state = ViewState::new(reference, settings.view_mode);
    let stdout = io::stdout();

    match command {
        Command::Calendar { week, month } => {
            if week {
                state.mode = ViewMode::Week;
            } else if month {
                state.mode = ViewMode::Month;
            }
            let grid = composer.calendar(&state);
            let summary = summarize_period(
                &tasks,
                state.mode,
                state.reference,
                &settings.grid_options(),
            );
            renderer.render_calendar(
                stdout.lock(),
                &grid,
                settings.week_start,
                settings.display_cap(state.mode),
                today,
                &summary,
            )
        }
        Command::Board => renderer.render_board(stdout.lock(), &composer.board()),
        Command::Move {
            task_id,
            status,
            apply,
        } => {
            if recognize(&status).is_none() {
                warn!(%status, "status matches no known column; moving to Pending");
            }
            let status = normalize(Some(&status));
            let gestures = vec![
                Gesture::DragStart {
                    task_id: TaskId::new(task_id),
                },
                Gesture::DropOnColumn { status },
            ];
            run_gestures(store, &tasks, &composer, &mut state, gestures, today, renderer, apply)
        }
        Command::Reschedule {
            task_id,
            date,
            apply,
        } => {
            let gestures = vec![
                Gesture::DragStart {
                    task_id: TaskId::new(task_id),
                },
                Gesture::DropOnDay { date },
            ];
            run_gestures(store, &tasks, &composer, &mut state, gestures, today, renderer, apply)
        }
        Command::Toggle { task_id, apply } => {
            let gestures = vec![Gesture::ToggleCheckbox {
                task_id: TaskId::new(task_id),
            }];
            run_gestures(store, &tasks, &composer, &mut state, gestures, today, renderer, apply)
        }
        Command::Replay { gestures, apply } => {
            let gestures = load_gestures(&gestures)?;
            run_gestures(store, &tasks, &composer, &mut state, gestures, today, renderer, apply)
        }
    }
}

fn load_gestures(path: &Path) -> anyhow::Result<Vec<Gesture>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read gestures from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse gestures in {}", path.display()))
}

/// Feeds gestures through the composer, then plays the role of the page-level
/// caller: every mutation goes through the per-task queue and is printed as
/// the request it would become, and with `--apply` written to the task file.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(gestures = gestures.len(), apply = apply.apply))]
fn run_gestures(
    store: &TaskFile,
    tasks: &[Task],
    composer: &ViewComposer<'_>,
    state: &mut ViewState,
    gestures: Vec<Gesture>,
    today: NaiveDate,
    renderer: &Renderer,
    apply: ApplyArgs,
) -> anyhow::Result<()> {
    let mut recorder = IntentRecorder::default();
    for gesture in gestures {
        composer.dispatch(state, gesture, today, &mut recorder);
    }

    let mut queue = UpdateQueue::new();
    for mutation in recorder.mutations() {
        queue.enqueue(mutation.clone());
    }

    let mut updated = tasks.to_vec();
    let mut requests: Vec<UpdateRequest> = Vec::new();
    let mut applied = 0_usize;
    while let Some(dispatch) = queue.next_ready() {
        requests.push(dispatch.mutation.request());
        let outcome = apply_mutation(&mut updated, &dispatch.mutation).map_err(|err| format!("{err:#}"));
        if outcome.is_ok() {
            applied += 1;
        }
        queue.complete(dispatch.ticket, outcome);
    }

    if requests.is_empty() {
        warn!("gestures produced no updates");
    }
    renderer.render_requests(io::stdout().lock(), &requests)?;

    if apply.apply && applied > 0 {
        store.save(&updated)?;
        info!(applied, path = %store.path.display(), "updates written");
    }

    Ok(())
}
