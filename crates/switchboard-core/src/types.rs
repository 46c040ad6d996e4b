//! Shared enumerations for switchboard-core

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DispatchError;

/// Ticket urgency tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Tiers in the order queues are drained
    pub const BY_URGENCY: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Numeric encoding used by the advisory model (low = 0 .. high = 2)
    pub fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

impl FromStr for Priority {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(DispatchError::Validation(format!(
                "invalid priority '{}', must be one of low, medium, high",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Kind of problem a ticket describes; each maps to one specialist
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Software,
    Hardware,
    Network,
}

impl TicketType {
    pub const ALL: [TicketType; 3] = [TicketType::Software, TicketType::Hardware, TicketType::Network];

    /// Numeric encoding used by the advisory model (software = 0 .. network = 2)
    pub fn index(self) -> usize {
        match self {
            Self::Software => 0,
            Self::Hardware => 1,
            Self::Network => 2,
        }
    }
}

impl FromStr for TicketType {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "software" => Ok(Self::Software),
            "hardware" => Ok(Self::Hardware),
            "network" => Ok(Self::Network),
            other => Err(DispatchError::Validation(format!(
                "invalid type '{}', must be one of software, hardware, network",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TicketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Software => write!(f, "software"),
            Self::Hardware => write!(f, "hardware"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Lifecycle state of a ticket. Only ever moves forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Waiting in a priority queue
    #[default]
    Open,
    /// Assigned to an agent
    Pending,
    Closed,
}

impl TicketStatus {
    /// Whether moving from `self` to `next` respects open → pending → closed
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Pending) | (Self::Open, Self::Closed) | (Self::Pending, Self::Closed)
        )
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Pending => write!(f, "pending"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_parse_case_insensitive() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" medium ".parse::<Priority>().unwrap(), Priority::Medium);
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
    }

    #[test]
    fn test_priority_parse_rejects_unknown() {
        let err = "urgent".parse::<Priority>().unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
    }

    #[test]
    fn test_type_parse() {
        assert_eq!("Network".parse::<TicketType>().unwrap(), TicketType::Network);
        assert!("printer".parse::<TicketType>().is_err());
        assert!("".parse::<TicketType>().is_err());
    }

    #[test]
    fn test_display_matches_serde() {
        for p in Priority::BY_URGENCY {
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p));
        }
        for t in TicketType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t));
        }
    }

    #[test]
    fn test_encodings() {
        assert_eq!(Priority::Low.index(), 0);
        assert_eq!(Priority::High.index(), 2);
        assert_eq!(TicketType::Software.index(), 0);
        assert_eq!(TicketType::Network.index(), 2);
    }

    #[test]
    fn test_status_transitions() {
        assert!(TicketStatus::Open.can_transition_to(TicketStatus::Pending));
        assert!(TicketStatus::Open.can_transition_to(TicketStatus::Closed));
        assert!(TicketStatus::Pending.can_transition_to(TicketStatus::Closed));
        assert!(!TicketStatus::Pending.can_transition_to(TicketStatus::Open));
        assert!(!TicketStatus::Closed.can_transition_to(TicketStatus::Pending));
        assert!(!TicketStatus::Closed.can_transition_to(TicketStatus::Closed));
    }
}
