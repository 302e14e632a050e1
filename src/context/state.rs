//! Loading state for the three sections of a context view.
//!
//! Each transition publishes a fresh immutable `ContextSnapshot`; readers
//! holding an older `Arc` keep a consistent view. Every fetch takes a
//! `FetchTicket` up front, and completions carrying a ticket older than the
//! section's latest one are dropped, so a slow response can never overwrite
//! the result of a newer request.

use crate::context::bus::{ContextBus, ContextEvent};
use crate::types::Record;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Unknown,
    InvalidTieBreaker,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::Unknown => "unknown",
            FailureReason::InvalidTieBreaker => "invalid_tie_breaker",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SectionStatus {
    Uninitialized,
    Loading,
    Loaded,
    Failed { reason: FailureReason },
}

impl SectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SectionStatus::Uninitialized => "uninitialized",
            SectionStatus::Loading => "loading",
            SectionStatus::Loaded => "loaded",
            SectionStatus::Failed { .. } => "failed",
        }
    }

    pub fn is_loaded(self) -> bool {
        matches!(self, SectionStatus::Loaded)
    }

    pub fn failure_reason(self) -> Option<FailureReason> {
        match self {
            SectionStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Anchor,
    Predecessors,
    Successors,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Anchor, Section::Predecessors, Section::Successors];

    fn slot(self) -> usize {
        match self {
            Section::Anchor => 0,
            Section::Predecessors => 1,
            Section::Successors => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Anchor => "anchor",
            Section::Predecessors => "predecessors",
            Section::Successors => "successors",
        }
    }
}

impl From<crate::types::SurroundingDirection> for Section {
    fn from(direction: crate::types::SurroundingDirection) -> Self {
        match direction {
            crate::types::SurroundingDirection::Predecessors => Section::Predecessors,
            crate::types::SurroundingDirection::Successors => Section::Successors,
        }
    }
}

/// Immutable view of the context at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub anchor_id: Option<String>,
    pub anchor: Option<Record>,
    pub predecessors: Vec<Record>,
    pub successors: Vec<Record>,
    pub anchor_status: SectionStatus,
    pub predecessors_status: SectionStatus,
    pub successors_status: SectionStatus,
}

impl Default for ContextSnapshot {
    fn default() -> Self {
        Self {
            anchor_id: None,
            anchor: None,
            predecessors: Vec::new(),
            successors: Vec::new(),
            anchor_status: SectionStatus::Uninitialized,
            predecessors_status: SectionStatus::Uninitialized,
            successors_status: SectionStatus::Uninitialized,
        }
    }
}

impl ContextSnapshot {
    pub fn status(&self, section: Section) -> SectionStatus {
        match section {
            Section::Anchor => self.anchor_status,
            Section::Predecessors => self.predecessors_status,
            Section::Successors => self.successors_status,
        }
    }

    fn clear_rows(&mut self, section: Section) {
        match section {
            Section::Anchor => self.anchor = None,
            Section::Predecessors => self.predecessors.clear(),
            Section::Successors => self.successors.clear(),
        }
    }

    fn status_mut(&mut self, section: Section) -> &mut SectionStatus {
        match section {
            Section::Anchor => &mut self.anchor_status,
            Section::Predecessors => &mut self.predecessors_status,
            Section::Successors => &mut self.successors_status,
        }
    }

    /// Display order: predecessors, anchor, successors.
    pub fn rows(&self) -> impl Iterator<Item = &Record> {
        self.predecessors
            .iter()
            .chain(self.anchor.iter())
            .chain(self.successors.iter())
    }

    pub fn is_settled(&self) -> bool {
        Section::ALL
            .iter()
            .all(|s| !matches!(self.status(*s), SectionStatus::Loading))
    }
}

/// Proof that a fetch was started; completion is applied only if it is current
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub section: Section,
    pub epoch: u64,
    pub seq: u64,
}

struct Inner {
    snapshot: Arc<ContextSnapshot>,
    epoch: u64,
    seq: [u64; 3],
}

/// Owns the published snapshot and serializes transitions
pub struct ContextStateMachine {
    inner: RwLock<Inner>,
    bus: ContextBus,
}

impl ContextStateMachine {
    pub fn new(bus: ContextBus) -> Self {
        Self {
            inner: RwLock::new(Inner {
                snapshot: Arc::new(ContextSnapshot::default()),
                epoch: 0,
                seq: [0; 3],
            }),
            bus,
        }
    }

    pub fn snapshot(&self) -> Arc<ContextSnapshot> {
        self.inner.read().snapshot.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    /// Start over for a new anchor; invalidates every outstanding ticket.
    pub fn reset(&self, anchor_id: impl Into<String>) -> u64 {
        let (epoch, snapshot) = {
            let mut inner = self.inner.write();
            inner.epoch += 1;
            inner.seq = [0; 3];
            inner.snapshot = Arc::new(ContextSnapshot {
                anchor_id: Some(anchor_id.into()),
                ..ContextSnapshot::default()
            });
            (inner.epoch, inner.snapshot.clone())
        };
        for section in Section::ALL {
            self.publish(epoch, section, &snapshot);
        }
        epoch
    }

    /// Mark `section` loading and hand out its ticket, with the snapshot the
    /// fetch should read its inputs from.
    ///
    /// Returns `None` when `epoch` is no longer current, or when a neighbour
    /// section is requested before the anchor has loaded. Starting the
    /// anchor puts both neighbour sections back to `Uninitialized` and
    /// invalidates their outstanding tickets.
    pub fn begin(&self, section: Section, epoch: u64) -> Option<(FetchTicket, Arc<ContextSnapshot>)> {
        let (ticket, snapshot, cleared) = {
            let mut inner = self.inner.write();
            if epoch != inner.epoch {
                debug!(
                    section = section.as_str(),
                    epoch,
                    current_epoch = inner.epoch,
                    "not starting fetch for a replaced anchor"
                );
                return None;
            }
            if section != Section::Anchor && !inner.snapshot.anchor_status.is_loaded() {
                debug!(
                    section = section.as_str(),
                    anchor_status = inner.snapshot.anchor_status.as_str(),
                    "not starting fetch without a loaded anchor"
                );
                return None;
            }

            let mut next = (*inner.snapshot).clone();
            let mut cleared = Vec::new();
            if section == Section::Anchor {
                for neighbour in [Section::Predecessors, Section::Successors] {
                    inner.seq[neighbour.slot()] += 1;
                    if next.status(neighbour) != SectionStatus::Uninitialized {
                        next.clear_rows(neighbour);
                        *next.status_mut(neighbour) = SectionStatus::Uninitialized;
                        cleared.push(neighbour);
                    }
                }
            }
            inner.seq[section.slot()] += 1;
            let ticket = FetchTicket {
                section,
                epoch: inner.epoch,
                seq: inner.seq[section.slot()],
            };
            *next.status_mut(section) = SectionStatus::Loading;
            inner.snapshot = Arc::new(next);
            (ticket, inner.snapshot.clone(), cleared)
        };
        for neighbour in cleared {
            self.publish(ticket.epoch, neighbour, &snapshot);
        }
        self.publish(ticket.epoch, section, &snapshot);
        Some((ticket, snapshot))
    }

    pub fn complete_anchor(&self, ticket: FetchTicket, anchor: Record) -> bool {
        self.apply(ticket, |snapshot| {
            snapshot.anchor = Some(anchor);
            snapshot.anchor_status = SectionStatus::Loaded;
        })
    }

    pub fn complete_rows(&self, ticket: FetchTicket, rows: Vec<Record>) -> bool {
        let section = ticket.section;
        self.apply(ticket, |snapshot| {
            match section {
                Section::Predecessors => snapshot.predecessors = rows,
                Section::Successors => snapshot.successors = rows,
                Section::Anchor => {}
            }
            *snapshot.status_mut(section) = SectionStatus::Loaded;
        })
    }

    /// Record a failure; the section's rows are cleared.
    pub fn fail(&self, ticket: FetchTicket, reason: FailureReason) -> bool {
        let section = ticket.section;
        self.apply(ticket, |snapshot| {
            snapshot.clear_rows(section);
            *snapshot.status_mut(section) = SectionStatus::Failed { reason };
        })
    }

    /// Fail every section at once, without any fetch having started.
    pub fn fail_all(&self, epoch: u64, reason: FailureReason) -> bool {
        let snapshot = {
            let mut inner = self.inner.write();
            if epoch != inner.epoch {
                return false;
            }
            for seq in inner.seq.iter_mut() {
                *seq += 1;
            }
            let mut next = (*inner.snapshot).clone();
            for section in Section::ALL {
                next.clear_rows(section);
                *next.status_mut(section) = SectionStatus::Failed { reason };
            }
            inner.snapshot = Arc::new(next);
            inner.snapshot.clone()
        };
        for section in Section::ALL {
            self.publish(epoch, section, &snapshot);
        }
        true
    }

    fn apply(&self, ticket: FetchTicket, update: impl FnOnce(&mut ContextSnapshot)) -> bool {
        let snapshot = {
            let mut inner = self.inner.write();
            if ticket.epoch != inner.epoch || ticket.seq != inner.seq[ticket.section.slot()] {
                warn!(
                    section = ticket.section.as_str(),
                    epoch = ticket.epoch,
                    current_epoch = inner.epoch,
                    seq = ticket.seq,
                    "dropping stale fetch result"
                );
                return false;
            }
            let mut next = (*inner.snapshot).clone();
            update(&mut next);
            inner.snapshot = Arc::new(next);
            inner.snapshot.clone()
        };
        debug!(
            section = ticket.section.as_str(),
            status = snapshot.status(ticket.section).as_str(),
            "section transition"
        );
        self.publish(ticket.epoch, ticket.section, &snapshot);
        true
    }

    fn publish(&self, epoch: u64, section: Section, snapshot: &Arc<ContextSnapshot>) {
        self.bus.emit(ContextEvent {
            epoch,
            section,
            status: snapshot.status(section),
            snapshot: snapshot.clone(),
        });
    }
}
