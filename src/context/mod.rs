//! Context domain: anchor lookup, windowed neighbour retrieval, and the
//! per-section loading state of a context view.
//!
//! `session` is the entry point; the other modules are the stateless steps it
//! composes and can be driven directly.

pub mod anchor;
pub mod bus;
pub mod session;
pub mod state;
pub mod surrounding;
pub mod window;

pub use anchor::fetch_anchor;
pub use bus::{ContextBus, ContextEvent};
pub use session::{ContextSession, ContextSettings};
pub use state::{
    ContextSnapshot, ContextStateMachine, FailureReason, FetchTicket, Section, SectionStatus,
};
pub use surrounding::{fetch_surrounding_docs, SurroundingQuery};
pub use window::{fetch_hits_in_interval, WindowQuery};
