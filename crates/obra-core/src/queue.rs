use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info, warn};

use crate::intent::Mutation;
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub ticket: Ticket,
    pub mutation: Mutation,
}

#[derive(Debug)]
struct Lane {
    in_flight: Option<Ticket>,
    queued: VecDeque<(Ticket, Mutation)>,
}

/// Per-task command queue for outgoing updates.
///
/// At most one mutation per task is in flight. A queued mutation that has not
/// been dispatched yet is replaced by a newer one of the same kind, so rapid
/// consecutive drags of the same task resolve to the last one. The merged
/// entry takes the newer ticket's place at the back of the lane, keeping
/// tickets in dispatch order.
#[derive(Debug, Default)]
pub struct UpdateQueue {
    next_ticket: u64,
    lanes: BTreeMap<TaskId, Lane>,
}

impl UpdateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(skip(self, mutation), fields(task = %mutation.task_id()))]
    pub fn enqueue(&mut self, mutation: Mutation) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);

        let lane = self
            .lanes
            .entry(mutation.task_id().clone())
            .or_insert_with(|| Lane {
                in_flight: None,
                queued: VecDeque::new(),
            });

        let superseded = lane
            .queued
            .iter()
            .rposition(|(_, queued)| queued.same_kind(&mutation));
        let mutation = match superseded.and_then(|idx| lane.queued.remove(idx)) {
            Some((replaced, older)) => {
                debug!(replaced = replaced.0, ticket = ticket.0, "coalesced queued mutation");
                mutation.coalesce(older)
            }
            None => mutation,
        };
        lane.queued.push_back((ticket, mutation));

        ticket
    }

    /// Hands out the oldest queued mutation whose task has nothing in flight.
    pub fn next_ready(&mut self) -> Option<Dispatch> {
        let (task_id, _) = self
            .lanes
            .iter()
            .filter(|(_, lane)| lane.in_flight.is_none())
            .filter_map(|(task_id, lane)| lane.queued.front().map(|(ticket, _)| (task_id, *ticket)))
            .min_by_key(|(_, ticket)| *ticket)?;
        let task_id = task_id.clone();

        let lane = self.lanes.get_mut(&task_id)?;
        let (ticket, mutation) = lane.queued.pop_front()?;
        lane.in_flight = Some(ticket);
        debug!(task = %task_id, ticket = ticket.0, "dispatching mutation");
        Some(Dispatch { ticket, mutation })
    }

    /// Frees the task's slot. Failed updates are logged and dropped.
    pub fn complete(&mut self, ticket: Ticket, outcome: Result<(), String>) -> bool {
        let Some((task_id, lane)) = self
            .lanes
            .iter_mut()
            .find(|(_, lane)| lane.in_flight == Some(ticket))
        else {
            warn!(ticket = ticket.0, "completion for unknown ticket");
            return false;
        };

        lane.in_flight = None;
        match outcome {
            Ok(()) => info!(task = %task_id, ticket = ticket.0, "mutation applied"),
            Err(error) => warn!(task = %task_id, ticket = ticket.0, %error, "mutation failed; not retried"),
        }

        let task_id = task_id.clone();
        if self
            .lanes
            .get(&task_id)
            .is_some_and(|lane| lane.queued.is_empty())
        {
            self.lanes.remove(&task_id);
        }
        true
    }

    pub fn is_idle(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn queued_len(&self) -> usize {
        self.lanes.values().map(|lane| lane.queued.len()).sum()
    }
}
