//! Agent declaration: identity, specialization and optional capacity override

use serde::{Deserialize, Serialize};

use crate::types::TicketType;

/// A specialist agent as declared in the routing policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentProfile {
    /// Display name, also the key used by fallback rules
    pub name: String,
    /// Stable identifier in the external user directory
    pub external_id: String,
    /// The ticket type this agent is first choice for
    pub specialization: TicketType,
    /// Per-agent limit; falls back to the policy-wide capacity when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
}

impl AgentProfile {
    pub fn new(
        name: impl Into<String>,
        external_id: impl Into<String>,
        specialization: TicketType,
    ) -> Self {
        Self {
            name: name.into(),
            external_id: external_id.into(),
            specialization,
            capacity: None,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Capacity this agent runs with under a given shared default
    pub fn effective_capacity(&self, shared: usize) -> usize {
        self.capacity.unwrap_or(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_new() {
        let p = AgentProfile::new("Agent 1", "abc123", TicketType::Software);
        assert_eq!(p.name, "Agent 1");
        assert_eq!(p.specialization, TicketType::Software);
        assert!(p.capacity.is_none());
    }

    #[test]
    fn test_effective_capacity() {
        let p = AgentProfile::new("Agent 1", "abc123", TicketType::Software);
        assert_eq!(p.effective_capacity(5), 5);
        let p = p.with_capacity(2);
        assert_eq!(p.effective_capacity(5), 2);
    }

    #[test]
    fn test_profile_from_toml() {
        let p: AgentProfile = toml::from_str(
            r#"
            name = "Agent 2"
            external_id = "692a056cfad7d194cd3f0992"
            specialization = "hardware"
            "#,
        )
        .unwrap();
        assert_eq!(p.specialization, TicketType::Hardware);
        assert!(p.capacity.is_none());
    }
}
