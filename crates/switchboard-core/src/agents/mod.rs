//! Specialist agents: declarations and the live registry
//!
//! Each agent has one primary specialization, a capacity limit and an
//! ordered workload of ticket ids. The registry is the only place workloads
//! change, and it never lets a workload grow past capacity.

pub mod profile;
pub mod registry;

pub use profile::AgentProfile;
pub use registry::{Agent, AgentLoad, AgentRegistry};
