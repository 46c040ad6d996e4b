//! switchboard-core - Ticket routing and agent assignment
//!
//! This crate provides:
//! - Agent registry with per-agent capacity and specialization
//! - Routing policy: specialists, fallback table, capacity limits
//! - FCFS priority queues drained whenever capacity frees up
//! - Routing engine that owns all state behind one lock
//! - Optional advisory classifier (metadata only, never consulted for routing)

pub mod agents;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod policy;
pub mod queues;
pub mod ticket;
pub mod types;

// Re-export main types for convenience
pub use agents::{AgentLoad, AgentProfile, AgentRegistry};
pub use classifier::{Advisory, AdvisoryClassifier, Classification, MlpClassifier, MlpWeights};
pub use engine::{Assignment, CloseOutcome, CreateOutcome, RoutingEngine, StatusSnapshot};
pub use error::{DispatchError, Result};
pub use policy::{FallbackRule, RoutingPolicy, DEFAULT_CAPACITY};
pub use queues::QueueSnapshot;
pub use ticket::Ticket;
pub use types::{Priority, TicketStatus, TicketType};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        let _ = std::mem::size_of::<RoutingEngine>();
        let _ = std::mem::size_of::<RoutingPolicy>();
        let _ = std::mem::size_of::<Ticket>();
        let _ = std::mem::size_of::<StatusSnapshot>();
        let _ = std::mem::size_of::<MlpClassifier>();
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RoutingEngine>();
    }
}
