//! Ticket entity and the in-memory ticket store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::classifier::Advisory;
use crate::error::{DispatchError, Result};
use crate::types::{Priority, TicketStatus, TicketType};

/// A support ticket. Tickets are never deleted, only closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub status: TicketStatus,
    /// Name of the agent holding the ticket; kept after closure for audit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Classifier output captured at creation; informational only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<Advisory>,
}

impl Ticket {
    pub fn new(id: impl Into<String>, priority: Priority, ticket_type: TicketType) -> Self {
        Self {
            id: id.into(),
            priority,
            ticket_type,
            status: TicketStatus::Open,
            assigned_agent: None,
            assigned_agent_id: None,
            created_at: Utc::now(),
            closed_at: None,
            advisory: None,
        }
    }

    /// Hand the ticket to an agent (open → pending)
    pub(crate) fn assign(&mut self, agent_name: &str, agent_id: &str) {
        debug_assert!(self.status.can_transition_to(TicketStatus::Pending));
        self.status = TicketStatus::Pending;
        self.assigned_agent = Some(agent_name.to_string());
        self.assigned_agent_id = Some(agent_id.to_string());
    }

    /// Mark closed (open or pending → closed)
    pub(crate) fn close(&mut self) {
        debug_assert!(self.status.can_transition_to(TicketStatus::Closed));
        self.status = TicketStatus::Closed;
        self.closed_at = Some(Utc::now());
    }

    pub fn is_closed(&self) -> bool {
        self.status == TicketStatus::Closed
    }

    /// Assigned and not yet closed
    pub fn is_assigned(&self) -> bool {
        self.status == TicketStatus::Pending
    }
}

/// Tickets keyed by id
#[derive(Debug, Default)]
pub struct TicketStore {
    tickets: HashMap<String, Ticket>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new ticket. Ids are unique for the lifetime of the store.
    pub fn insert(&mut self, ticket: Ticket) -> Result<()> {
        if self.tickets.contains_key(&ticket.id) {
            return Err(DispatchError::Validation(format!(
                "ticket '{}' already exists",
                ticket.id
            )));
        }
        self.tickets.insert(ticket.id.clone(), ticket);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Ticket> {
        self.tickets.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Ticket> {
        self.tickets.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tickets.contains_key(id)
    }

    /// Number of tickets ever created, closed ones included
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.values()
    }

    pub fn clear(&mut self) {
        self.tickets.clear();
    }
}
