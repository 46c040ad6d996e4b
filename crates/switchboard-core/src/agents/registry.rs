//! Live workload and capacity for the declared agents

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::profile::AgentProfile;
use crate::error::Result;
use crate::policy::RoutingPolicy;
use crate::types::TicketType;

/// An agent and the tickets it currently holds
#[derive(Debug, Clone)]
pub struct Agent {
    pub profile: AgentProfile,
    pub capacity: usize,
    /// Ticket ids in assignment order
    workload: Vec<String>,
}

impl Agent {
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn external_id(&self) -> &str {
        &self.profile.external_id
    }

    pub fn specialization(&self) -> TicketType {
        self.profile.specialization
    }

    pub fn load(&self) -> usize {
        self.workload.len()
    }

    pub fn is_available(&self) -> bool {
        self.workload.len() < self.capacity
    }

    pub fn workload(&self) -> &[String] {
        &self.workload
    }

    pub fn snapshot(&self) -> AgentLoad {
        AgentLoad {
            name: self.profile.name.clone(),
            agent_id: self.profile.external_id.clone(),
            specialization: self.profile.specialization,
            load: self.load(),
            capacity: self.capacity,
            available: self.is_available(),
            ticket_ids: self.workload.clone(),
        }
    }
}

/// Point-in-time view of one agent
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentLoad {
    pub name: String,
    pub agent_id: String,
    pub specialization: TicketType,
    pub load: usize,
    pub capacity: usize,
    pub available: bool,
    pub ticket_ids: Vec<String>,
}

/// Fixed set of agents, addressed by position in declared order
pub struct AgentRegistry {
    agents: Vec<Agent>,
    by_name: HashMap<String, usize>,
    primary: HashMap<TicketType, usize>,
}

impl AgentRegistry {
    /// Build the registry from a policy, validating it first
    pub fn from_policy(policy: &RoutingPolicy) -> Result<Self> {
        policy.validate()?;

        let mut agents = Vec::with_capacity(policy.agents.len());
        let mut by_name = HashMap::new();
        let mut primary = HashMap::new();
        for (idx, profile) in policy.agents.iter().enumerate() {
            by_name.insert(profile.name.clone(), idx);
            primary.insert(profile.specialization, idx);
            agents.push(Agent {
                capacity: profile.effective_capacity(policy.capacity),
                profile: profile.clone(),
                workload: Vec::new(),
            });
        }

        debug!("AgentRegistry: {} agents loaded", agents.len());
        Ok(Self {
            agents,
            by_name,
            primary,
        })
    }

    pub fn get(&self, idx: usize) -> Option<&Agent> {
        self.agents.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Agent> {
        self.index_of(name).and_then(|idx| self.agents.get(idx))
    }

    /// Index of the specialist for a ticket type. Policy validation
    /// guarantees one exists for every type.
    pub fn primary_for(&self, ticket_type: TicketType) -> Option<usize> {
        self.primary.get(&ticket_type).copied()
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.by_name(name).is_some_and(Agent::is_available)
    }

    pub fn load(&self, name: &str) -> usize {
        self.by_name(name).map(Agent::load).unwrap_or(0)
    }

    /// Names of agents with spare capacity, declared order
    pub fn available_agents(&self) -> Vec<&str> {
        self.agents
            .iter()
            .filter(|a| a.is_available())
            .map(|a| a.name())
            .collect()
    }

    /// First agent in declared order with spare capacity
    pub fn first_available(&self) -> Option<usize> {
        self.agents.iter().position(Agent::is_available)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Append a ticket to an agent's workload. Returns false, leaving the
    /// workload untouched, if the agent is unknown or full.
    pub(crate) fn assign(&mut self, idx: usize, ticket_id: &str) -> bool {
        let Some(agent) = self.agents.get_mut(idx) else {
            return false;
        };
        if !agent.is_available() {
            warn!(
                "AgentRegistry: refused '{}' for '{}' at capacity {}",
                ticket_id,
                agent.name(),
                agent.capacity
            );
            return false;
        }
        agent.workload.push(ticket_id.to_string());
        true
    }

    /// Remove a ticket from the named agent's workload, freeing one slot
    pub(crate) fn release(&mut self, name: &str, ticket_id: &str) -> bool {
        let Some(idx) = self.index_of(name) else {
            return false;
        };
        let workload = &mut self.agents[idx].workload;
        match workload.iter().position(|t| t == ticket_id) {
            Some(pos) => {
                workload.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear_workloads(&mut self) {
        for agent in &mut self.agents {
            agent.workload.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AgentRegistry {
        AgentRegistry::from_policy(&RoutingPolicy::default().with_capacity(2)).unwrap()
    }

    #[test]
    fn test_from_policy_keeps_declared_order() {
        let reg = registry();
        let names: Vec<&str> = reg.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["Agent 1", "Agent 2", "Agent 3"]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_primary_lookup() {
        let reg = registry();
        let idx = reg.primary_for(TicketType::Hardware).unwrap();
        assert_eq!(reg.get(idx).unwrap().name(), "Agent 2");
    }

    #[test]
    fn test_assign_respects_capacity() {
        let mut reg = registry();
        assert!(reg.assign(0, "T1"));
        assert!(reg.assign(0, "T2"));
        assert!(!reg.is_available("Agent 1"));
        assert!(!reg.assign(0, "T3"));
        assert_eq!(reg.load("Agent 1"), 2);
        assert_eq!(reg.get(0).unwrap().workload(), &["T1".to_string(), "T2".to_string()]);
    }

    #[test]
    fn test_release_frees_one_slot() {
        let mut reg = registry();
        reg.assign(1, "T1");
        reg.assign(1, "T2");
        assert!(reg.release("Agent 2", "T1"));
        assert_eq!(reg.load("Agent 2"), 1);
        assert!(reg.is_available("Agent 2"));
        assert!(!reg.release("Agent 2", "T1"));
        assert!(!reg.release("Agent 9", "T2"));
    }

    #[test]
    fn test_available_agents_order() {
        let mut reg = registry();
        reg.assign(1, "T1");
        reg.assign(1, "T2");
        assert_eq!(reg.available_agents(), vec!["Agent 1", "Agent 3"]);
        assert_eq!(reg.first_available(), Some(0));
    }

    #[test]
    fn test_per_agent_capacity_override() {
        let mut policy = RoutingPolicy::default();
        policy.agents[2].capacity = Some(1);
        let mut reg = AgentRegistry::from_policy(&policy).unwrap();
        assert_eq!(reg.get(0).unwrap().capacity, 5);
        assert!(reg.assign(2, "T1"));
        assert!(!reg.assign(2, "T2"));
    }

    #[test]
    fn test_unknown_agent_queries() {
        let reg = registry();
        assert!(!reg.is_available("nobody"));
        assert_eq!(reg.load("nobody"), 0);
        assert!(reg.index_of("nobody").is_none());
    }

    #[test]
    fn test_snapshot() {
        let mut reg = registry();
        reg.assign(2, "N1");
        let snap = reg.get(2).unwrap().snapshot();
        assert_eq!(snap.name, "Agent 3");
        assert_eq!(snap.agent_id, "69438f79c1af7ec03ff7fed0");
        assert_eq!(snap.load, 1);
        assert_eq!(snap.capacity, 2);
        assert!(snap.available);
        assert_eq!(snap.ticket_ids, vec!["N1".to_string()]);
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let policy = RoutingPolicy::default().with_capacity(0);
        assert!(AgentRegistry::from_policy(&policy).is_err());
    }
}
