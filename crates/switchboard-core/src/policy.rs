//! Declarative routing policy: agent roster, shared capacity and the
//! secondary-assignment table consulted when a specialist is full.
//!
//! The policy is plain data. It is deserialized once at startup (the CLI
//! reads it from the `[routing]` section of its TOML config) and validated
//! before an engine is built from it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::agents::AgentProfile;
use crate::error::{DispatchError, Result};
use crate::types::{Priority, TicketType};

/// Default per-agent ticket limit
pub const DEFAULT_CAPACITY: usize = 5;

/// Ordered fallback agents for one (priority, type) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FallbackRule {
    pub priority: Priority,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub agents: Vec<String>,
}

impl FallbackRule {
    pub fn new(priority: Priority, ticket_type: TicketType, agents: &[&str]) -> Self {
        Self {
            priority,
            ticket_type,
            agents: agents.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingPolicy {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Agents in declared order; this order breaks ties in the last-resort step
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentProfile>,
    #[serde(default = "default_fallbacks")]
    pub fallbacks: Vec<FallbackRule>,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_agents() -> Vec<AgentProfile> {
    vec![
        AgentProfile::new("Agent 1", "692479b918668dee67209282", TicketType::Software),
        AgentProfile::new("Agent 2", "692a056cfad7d194cd3f0992", TicketType::Hardware),
        AgentProfile::new("Agent 3", "69438f79c1af7ec03ff7fed0", TicketType::Network),
    ]
}

fn default_fallbacks() -> Vec<FallbackRule> {
    vec![
        FallbackRule::new(Priority::Medium, TicketType::Software, &["Agent 1", "Agent 2"]),
        FallbackRule::new(Priority::Medium, TicketType::Hardware, &["Agent 2", "Agent 3"]),
        FallbackRule::new(Priority::Medium, TicketType::Network, &["Agent 3", "Agent 1"]),
        FallbackRule::new(Priority::Low, TicketType::Software, &["Agent 1", "Agent 3"]),
        FallbackRule::new(Priority::Low, TicketType::Hardware, &["Agent 2", "Agent 1"]),
        FallbackRule::new(Priority::Low, TicketType::Network, &["Agent 3", "Agent 2"]),
    ]
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            agents: default_agents(),
            fallbacks: default_fallbacks(),
        }
    }
}

impl RoutingPolicy {
    /// Same roster and table with a different shared capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Ordered fallback agent names for a (priority, type) pair; empty if none configured
    pub fn fallbacks_for(&self, priority: Priority, ticket_type: TicketType) -> &[String] {
        self.fallbacks
            .iter()
            .find(|r| r.priority == priority && r.ticket_type == ticket_type)
            .map(|r| r.agents.as_slice())
            .unwrap_or(&[])
    }

    pub fn agent(&self, name: &str) -> Option<&AgentProfile> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Check the policy is usable by the engine.
    ///
    /// Every ticket type needs exactly one specialist, names and external ids
    /// are unique, capacities are non-zero, and fallback rules only reference
    /// declared agents. High-priority tickets never fall back, so a rule for
    /// the high tier is rejected rather than silently ignored.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(DispatchError::Policy("capacity must be at least 1".into()));
        }
        if self.agents.is_empty() {
            return Err(DispatchError::Policy("no agents declared".into()));
        }

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                return Err(DispatchError::Policy("agent name must not be empty".into()));
            }
            if !names.insert(agent.name.as_str()) {
                return Err(DispatchError::Policy(format!(
                    "duplicate agent name '{}'",
                    agent.name
                )));
            }
            if !ids.insert(agent.external_id.as_str()) {
                return Err(DispatchError::Policy(format!(
                    "duplicate external id '{}'",
                    agent.external_id
                )));
            }
            if agent.capacity == Some(0) {
                return Err(DispatchError::Policy(format!(
                    "agent '{}' has zero capacity",
                    agent.name
                )));
            }
        }

        for ticket_type in TicketType::ALL {
            let specialists = self
                .agents
                .iter()
                .filter(|a| a.specialization == ticket_type)
                .count();
            if specialists != 1 {
                return Err(DispatchError::Policy(format!(
                    "ticket type '{}' needs exactly one specialist, found {}",
                    ticket_type, specialists
                )));
            }
        }

        let mut keys = HashSet::new();
        for rule in &self.fallbacks {
            if rule.priority == Priority::High {
                return Err(DispatchError::Policy(format!(
                    "fallback rule for (high, {}) is not allowed",
                    rule.ticket_type
                )));
            }
            if !keys.insert((rule.priority, rule.ticket_type)) {
                return Err(DispatchError::Policy(format!(
                    "duplicate fallback rule for ({}, {})",
                    rule.priority, rule.ticket_type
                )));
            }
            if let Some(unknown) = rule.agents.iter().find(|a| !names.contains(a.as_str())) {
                return Err(DispatchError::Policy(format!(
                    "fallback rule ({}, {}) references unknown agent '{}'",
                    rule.priority, rule.ticket_type, unknown
                )));
            }
        }

        Ok(())
    }
}
