//! Context session: drives anchor, predecessor and successor fetches for one
//! anchor at a time and records the outcome in the state machine.
//!
//! Errors never escape a session call; they end up as section status.

use crate::config::ContextConfig;
use crate::context::anchor::fetch_anchor;
use crate::context::bus::{ContextBus, ContextEvent};
use crate::context::state::{ContextSnapshot, ContextStateMachine, FetchTicket, Section, SectionStatus};
use crate::context::surrounding::{fetch_surrounding_docs, SurroundingQuery};
use crate::dataset::Dataset;
use crate::error::ContextError;
use crate::interval::Ladder;
use crate::search::{Filter, SearchSource};
use crate::sort::{SortDirection, SortSpec};
use crate::types::{Record, SurroundingDirection};
use parking_lot::RwLock;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{info, warn};

/// Sizing, ordering and tie-breaker policy for a session
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSettings {
    pub default_size: usize,
    pub step: usize,
    pub max_size: usize,
    pub tie_breaker_fields: Vec<String>,
    pub ladder: Ladder,
    /// Display order of context rows
    pub sort: SortDirection,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            default_size: 5,
            step: 5,
            max_size: 10_000,
            tie_breaker_fields: vec!["_doc".to_string()],
            ladder: Ladder::default(),
            sort: SortDirection::Desc,
        }
    }
}

impl ContextSettings {
    pub fn from_config(config: &ContextConfig) -> Result<Self, ContextError> {
        Ok(Self {
            default_size: config.default_size.min(config.max_size),
            step: config.step,
            max_size: config.max_size,
            tie_breaker_fields: config.tie_breaker_fields.clone(),
            ladder: config.ladder()?,
            sort: config.default_sort,
        })
    }

    /// Bound a requested row count to `[0, max_size]`.
    pub fn clamp(&self, count: usize) -> usize {
        count.min(self.max_size)
    }
}

#[derive(Debug, Clone)]
struct Params {
    predecessor_count: usize,
    successor_count: usize,
    filters: Vec<Filter>,
}

struct SessionInner {
    source: Arc<dyn SearchSource>,
    dataset: Dataset,
    settings: ContextSettings,
    state: ContextStateMachine,
    bus: ContextBus,
    params: RwLock<Params>,
}

/// Cheap to clone; clones share state
#[derive(Clone)]
pub struct ContextSession {
    inner: Arc<SessionInner>,
}

impl ContextSession {
    pub fn new(source: Arc<dyn SearchSource>, dataset: Dataset, settings: ContextSettings) -> Self {
        let bus = ContextBus::new();
        let default_size = settings.clamp(settings.default_size);
        Self {
            inner: Arc::new(SessionInner {
                source,
                dataset,
                state: ContextStateMachine::new(bus.clone()),
                bus,
                params: RwLock::new(Params {
                    predecessor_count: default_size,
                    successor_count: default_size,
                    filters: Vec::new(),
                }),
                settings,
            }),
        }
    }

    /// Filters applied to neighbour queries from the first fetch on.
    pub fn with_filters(self, filters: Vec<Filter>) -> Self {
        self.inner.params.write().filters = filters;
        self
    }

    /// Initial row counts on each side, clamped to `max_size`.
    pub fn with_counts(self, predecessors: usize, successors: usize) -> Self {
        {
            let mut params = self.inner.params.write();
            params.predecessor_count = self.inner.settings.clamp(predecessors);
            params.successor_count = self.inner.settings.clamp(successors);
        }
        self
    }

    /// Receive every section transition from now on.
    pub fn subscribe(&self) -> Receiver<ContextEvent> {
        self.inner.bus.subscribe()
    }

    pub fn snapshot(&self) -> Arc<ContextSnapshot> {
        self.inner.state.snapshot()
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.inner.settings
    }

    pub fn dataset(&self) -> &Dataset {
        &self.inner.dataset
    }

    pub fn predecessor_count(&self) -> usize {
        self.inner.params.read().predecessor_count
    }

    pub fn successor_count(&self) -> usize {
        self.inner.params.read().successor_count
    }

    pub fn filters(&self) -> Vec<Filter> {
        self.inner.params.read().filters.clone()
    }

    /// Field used to order records sharing a timestamp.
    pub fn tie_breaker(&self) -> Result<String, ContextError> {
        self.inner
            .dataset
            .resolve_tie_breaker(&self.inner.settings.tie_breaker_fields)
    }

    /// Switch to a new anchor. Every section starts over and results still in
    /// flight for the old anchor are discarded when they land. Row counts and
    /// filters carry over.
    pub async fn set_anchor_id(&self, anchor_id: impl Into<String>) -> Arc<ContextSnapshot> {
        let anchor_id = anchor_id.into();
        let epoch = self.inner.state.reset(anchor_id.as_str());
        info!(anchor_id = %anchor_id, epoch, "anchor changed");
        self.fetch_all().await
    }

    /// Anchor first, then both sides concurrently.
    pub async fn fetch_all(&self) -> Arc<ContextSnapshot> {
        let epoch = self.inner.state.epoch();
        if let Err(err) = self.tie_breaker() {
            warn!(error = %err, "context rows cannot be ordered");
            self.inner.state.fail_all(epoch, err.failure_reason());
            return self.snapshot();
        }
        let anchor_status = self.load_anchor(epoch).await;
        // A newer anchor took over while this one was loading
        if self.inner.state.epoch() != epoch {
            return self.snapshot();
        }
        if anchor_status.is_loaded() {
            self.load_context_rows(epoch).await;
        }
        self.snapshot()
    }

    /// Re-fetch the anchor. Both neighbour sections are reset until they are
    /// fetched again around the new result.
    pub async fn fetch_anchor_row(&self) -> SectionStatus {
        self.load_anchor(self.inner.state.epoch()).await
    }

    /// Re-fetch predecessors and successors around the current anchor.
    pub async fn fetch_context_rows(&self) -> (SectionStatus, SectionStatus) {
        self.load_context_rows(self.inner.state.epoch()).await
    }

    /// Re-fetch one side. Without a loaded anchor nothing is queried and the
    /// section's current status is returned unchanged.
    pub async fn fetch_surrounding_rows(&self, direction: SurroundingDirection) -> SectionStatus {
        self.load_rows(direction, self.inner.state.epoch()).await
    }

    async fn load_anchor(&self, epoch: u64) -> SectionStatus {
        let Some((ticket, snapshot)) = self.inner.state.begin(Section::Anchor, epoch) else {
            return self.snapshot().status(Section::Anchor);
        };
        let result: Result<Record, ContextError> = async {
            let tie_breaker = self.tie_breaker()?;
            let anchor_id = snapshot
                .anchor_id
                .clone()
                .ok_or_else(|| ContextError::AnchorNotFound(String::new()))?;
            let dataset = &self.inner.dataset;
            let sort = SortSpec::new(
                dataset.time_field_name(),
                tie_breaker,
                self.inner.settings.sort,
                dataset.is_time_nanos_based(),
            );
            fetch_anchor(self.inner.source.as_ref(), dataset, &anchor_id, &sort).await
        }
        .await;

        match result {
            Ok(anchor) => {
                info!(anchor_id = %anchor.id, "anchor loaded");
                self.inner.state.complete_anchor(ticket, anchor);
            }
            Err(err) => self.record_failure(ticket, &err),
        }
        self.snapshot().status(Section::Anchor)
    }

    async fn load_context_rows(&self, epoch: u64) -> (SectionStatus, SectionStatus) {
        futures::join!(
            self.load_rows(SurroundingDirection::Predecessors, epoch),
            self.load_rows(SurroundingDirection::Successors, epoch)
        )
    }

    async fn load_rows(&self, direction: SurroundingDirection, epoch: u64) -> SectionStatus {
        let section = Section::from(direction);
        let Some((ticket, snapshot)) = self.inner.state.begin(section, epoch) else {
            return self.snapshot().status(section);
        };
        let params = self.inner.params.read().clone();
        let size = match direction {
            SurroundingDirection::Predecessors => params.predecessor_count,
            SurroundingDirection::Successors => params.successor_count,
        };

        let result: Result<Vec<Record>, ContextError> = async {
            let tie_breaker = self.tie_breaker()?;
            fetch_surrounding_docs(
                self.inner.source.as_ref(),
                SurroundingQuery {
                    direction,
                    dataset: &self.inner.dataset,
                    anchor: snapshot.anchor.as_ref(),
                    tie_breaker: &tie_breaker,
                    sort: self.inner.settings.sort,
                    size,
                    filters: &params.filters,
                    ladder: &self.inner.settings.ladder,
                },
            )
            .await
        }
        .await;

        match result {
            Ok(rows) => {
                info!(section = section.as_str(), hits = rows.len(), requested = size, "section loaded");
                self.inner.state.complete_rows(ticket, rows);
            }
            Err(err) => self.record_failure(ticket, &err),
        }
        self.snapshot().status(section)
    }

    pub async fn set_predecessor_count(&self, count: usize) -> SectionStatus {
        self.inner.params.write().predecessor_count = self.inner.settings.clamp(count);
        self.fetch_surrounding_rows(SurroundingDirection::Predecessors).await
    }

    pub async fn set_successor_count(&self, count: usize) -> SectionStatus {
        self.inner.params.write().successor_count = self.inner.settings.clamp(count);
        self.fetch_surrounding_rows(SurroundingDirection::Successors).await
    }

    /// Grow one side by `step` rows, up to `max_size`, and re-fetch that side.
    pub async fn load_more(&self, direction: SurroundingDirection) -> SectionStatus {
        {
            let step = self.inner.settings.step;
            let mut params = self.inner.params.write();
            let count = match direction {
                SurroundingDirection::Predecessors => &mut params.predecessor_count,
                SurroundingDirection::Successors => &mut params.successor_count,
            };
            *count = self.inner.settings.clamp(count.saturating_add(step));
        }
        self.fetch_surrounding_rows(direction).await
    }

    /// Replace the filter list; the anchor is kept, both sides are re-fetched.
    pub async fn set_filters(&self, filters: Vec<Filter>) -> (SectionStatus, SectionStatus) {
        self.inner.params.write().filters = filters;
        self.fetch_context_rows().await
    }

    fn record_failure(&self, ticket: FetchTicket, err: &ContextError) {
        warn!(section = ticket.section.as_str(), error = %err, "section failed");
        self.inner.state.fail(ticket, err.failure_reason());
    }
}
