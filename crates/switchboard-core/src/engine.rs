//! Routing engine: assignment decisions, ticket lifecycle and queue draining
//!
//! All mutable state (tickets, agent workloads, queues) sits behind a single
//! mutex and every public operation holds it for its whole duration, so a
//! close and the drain it triggers are one indivisible step.
//!
//! Decision order for a new or queued ticket:
//!
//! 1. the specialist for its type, if it has room
//! 2. high priority stops here and waits for the specialist
//! 3. the configured fallbacks for (priority, type), in order
//! 4. any agent with room, in declared order
//! 5. otherwise it waits in its priority queue

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::agents::{AgentLoad, AgentRegistry};
use crate::classifier::{Advisory, AdvisoryClassifier, Classification};
use crate::error::{DispatchError, Result};
use crate::policy::RoutingPolicy;
use crate::queues::{PriorityQueues, QueueSnapshot};
use crate::ticket::{Ticket, TicketStore};
use crate::types::{Priority, TicketStatus, TicketType};

/// A ticket handed to an agent
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Assignment {
    pub ticket_id: String,
    pub agent: String,
    pub agent_id: String,
}

/// Result of creating a ticket
#[derive(Debug, Clone, Serialize)]
pub struct CreateOutcome {
    pub ticket_id: String,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub status: TicketStatus,
    pub assigned_agent: Option<String>,
    pub assigned_agent_id: Option<String>,
    pub queued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<Advisory>,
}

/// Result of closing a ticket
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CloseOutcome {
    Closed {
        ticket_id: String,
        status: TicketStatus,
        /// Agent whose slot was freed; none if the ticket was still queued
        freed_agent: Option<String>,
        newly_assigned: Vec<Assignment>,
    },
    AlreadyClosed {
        ticket_id: String,
    },
}

impl CloseOutcome {
    pub fn newly_assigned(&self) -> &[Assignment] {
        match self {
            Self::Closed { newly_assigned, .. } => newly_assigned,
            Self::AlreadyClosed { .. } => &[],
        }
    }
}

/// Read-only view of the whole engine
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub agents: Vec<AgentLoad>,
    pub queues: QueueSnapshot,
    pub total_tickets: usize,
    pub pending_in_queue: usize,
    pub classifier_loaded: bool,
}

struct DispatchState {
    tickets: TicketStore,
    agents: AgentRegistry,
    queues: PriorityQueues,
}

pub struct RoutingEngine {
    policy: RoutingPolicy,
    state: Mutex<DispatchState>,
    classifier: Option<Arc<dyn AdvisoryClassifier>>,
}

impl RoutingEngine {
    /// Build an engine with no classifier
    pub fn new(policy: RoutingPolicy) -> Result<Self> {
        let agents = AgentRegistry::from_policy(&policy)?;
        info!(
            "RoutingEngine: {} agents, capacity {}, {} fallback rules",
            agents.len(),
            policy.capacity,
            policy.fallbacks.len()
        );
        Ok(Self {
            policy,
            state: Mutex::new(DispatchState {
                tickets: TicketStore::new(),
                agents,
                queues: PriorityQueues::new(),
            }),
            classifier: None,
        })
    }

    /// Attach an advisory classifier
    pub fn with_classifier(mut self, classifier: Arc<dyn AdvisoryClassifier>) -> Self {
        info!("RoutingEngine: advisory classifier '{}' attached", classifier.name());
        self.classifier = Some(classifier);
        self
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Routing state mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Which agent a ticket with this priority and type would go to right now.
    /// Does not change any state.
    pub fn decide_assignment(&self, priority: Priority, ticket_type: TicketType) -> Option<String> {
        let state = self.lock();
        decide(&self.policy, &state.agents, priority, ticket_type)
            .and_then(|idx| state.agents.get(idx))
            .map(|agent| agent.name().to_string())
    }

    /// Create a ticket from raw strings, validating priority and type
    pub fn create_ticket(&self, id: &str, priority: &str, ticket_type: &str) -> Result<CreateOutcome> {
        let priority: Priority = priority.parse()?;
        let ticket_type: TicketType = ticket_type.parse()?;
        self.submit(id, priority, ticket_type)
    }

    /// Create and route a ticket
    pub fn submit(&self, id: &str, priority: Priority, ticket_type: TicketType) -> Result<CreateOutcome> {
        let id = id.trim();
        if id.is_empty() {
            return Err(DispatchError::Validation("ticket id must not be empty".into()));
        }

        let advisory = self.advise(priority, ticket_type);

        let mut guard = self.lock();
        let state = &mut *guard;
        if state.tickets.contains(id) {
            return Err(DispatchError::Validation(format!("ticket '{}' already exists", id)));
        }

        let mut ticket = Ticket::new(id, priority, ticket_type);
        ticket.advisory = advisory.clone();

        match decide(&self.policy, &state.agents, priority, ticket_type) {
            Some(idx) if state.agents.assign(idx, id) => {
                if let Some(agent) = state.agents.get(idx) {
                    ticket.assign(agent.name(), agent.external_id());
                    info!(
                        "Ticket {} ({}, {}) assigned to {}",
                        id,
                        priority,
                        ticket_type,
                        agent.name()
                    );
                }
            }
            _ => {
                state.queues.push(priority, id);
                info!(
                    "Ticket {} ({}, {}) queued at position {}",
                    id,
                    priority,
                    ticket_type,
                    state.queues.len(priority)
                );
            }
        }

        let outcome = CreateOutcome {
            ticket_id: ticket.id.clone(),
            priority,
            ticket_type,
            status: ticket.status,
            assigned_agent: ticket.assigned_agent.clone(),
            assigned_agent_id: ticket.assigned_agent_id.clone(),
            queued: ticket.status == TicketStatus::Open,
            advisory,
        };
        state.tickets.insert(ticket)?;
        Ok(outcome)
    }

    /// Close a ticket, free whatever it held, then drain the queues
    pub fn close_ticket(&self, id: &str) -> Result<CloseOutcome> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let ticket = state
            .tickets
            .get_mut(id)
            .ok_or_else(|| DispatchError::NotFound(id.to_string()))?;

        if ticket.is_closed() {
            debug!("Ticket {} already closed", id);
            return Ok(CloseOutcome::AlreadyClosed {
                ticket_id: id.to_string(),
            });
        }

        let freed_agent = if ticket.is_assigned() {
            let agent = ticket.assigned_agent.clone();
            if let Some(name) = &agent {
                if !state.agents.release(name, id) {
                    warn!("Ticket {} was not in {}'s workload", id, name);
                }
            }
            agent
        } else {
            if !state.queues.remove(ticket.priority, id) {
                warn!("Queued ticket {} was missing from the {} queue", id, ticket.priority);
            }
            None
        };

        ticket.close();
        info!(
            "Ticket {} closed{}",
            id,
            freed_agent
                .as_deref()
                .map(|a| format!(", freed a slot on {}", a))
                .unwrap_or_default()
        );

        let newly_assigned = drain(&self.policy, state);
        Ok(CloseOutcome::Closed {
            ticket_id: id.to_string(),
            status: TicketStatus::Closed,
            freed_agent,
            newly_assigned,
        })
    }

    /// Re-evaluate every queued ticket once, high tier first
    pub fn drain_queues(&self) -> Vec<Assignment> {
        let mut guard = self.lock();
        drain(&self.policy, &mut guard)
    }

    pub fn status(&self) -> StatusSnapshot {
        let state = self.lock();
        StatusSnapshot {
            agents: state.agents.iter().map(|a| a.snapshot()).collect(),
            queues: state.queues.snapshot(),
            total_tickets: state.tickets.len(),
            pending_in_queue: state.queues.total(),
            classifier_loaded: self.classifier.is_some(),
        }
    }

    /// Names of agents with spare capacity, declared order
    pub fn available_agents(&self) -> Vec<String> {
        self.lock()
            .agents
            .available_agents()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn ticket(&self, id: &str) -> Result<Ticket> {
        self.lock()
            .tickets
            .get(id)
            .cloned()
            .ok_or_else(|| DispatchError::NotFound(id.to_string()))
    }

    /// Forget every ticket, workload and queue entry. Policy and classifier stay.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.tickets.clear();
        state.agents.clear_workloads();
        state.queues.clear();
        info!("RoutingEngine: state reset");
    }

    /// Classify from raw strings without creating a ticket
    pub fn classify_only(&self, priority: &str, ticket_type: &str) -> Result<Classification> {
        let priority: Priority = priority.parse()?;
        let ticket_type: TicketType = ticket_type.parse()?;
        self.classify(priority, ticket_type)
    }

    pub fn classify(&self, priority: Priority, ticket_type: TicketType) -> Result<Classification> {
        let classifier = self.classifier.as_ref().ok_or(DispatchError::ModelUnavailable)?;
        let advisory = classifier.score(priority, ticket_type)?;
        let profile = self.policy.agent(&advisory.predicted_agent);
        Ok(Classification {
            priority,
            ticket_type,
            predicted_agent_id: profile.map(|p| p.external_id.clone()),
            specialization: profile.map(|p| p.specialization),
            predicted_agent: advisory.predicted_agent,
            confidence: advisory.confidence,
            probabilities: advisory.probabilities,
        })
    }

    /// Advisory metadata for a new ticket; failures only cost the metadata
    fn advise(&self, priority: Priority, ticket_type: TicketType) -> Option<Advisory> {
        let classifier = self.classifier.as_ref()?;
        match classifier.score(priority, ticket_type) {
            Ok(advisory) => Some(advisory),
            Err(e) => {
                warn!(
                    "Classifier '{}' failed for ({}, {}): {}",
                    classifier.name(),
                    priority,
                    ticket_type,
                    e
                );
                None
            }
        }
    }
}

/// Pick an agent index for a ticket, or none if it has to wait
fn decide(
    policy: &RoutingPolicy,
    agents: &AgentRegistry,
    priority: Priority,
    ticket_type: TicketType,
) -> Option<usize> {
    let primary = agents.primary_for(ticket_type)?;
    if agents.get(primary).is_some_and(|a| a.is_available()) {
        return Some(primary);
    }

    if priority == Priority::High {
        debug!("High {} ticket waits for its specialist", ticket_type);
        return None;
    }

    let fallback = policy
        .fallbacks_for(priority, ticket_type)
        .iter()
        .filter_map(|name| agents.index_of(name))
        .find(|idx| agents.get(*idx).is_some_and(|a| a.is_available()));
    if let Some(idx) = fallback {
        debug!("({}, {}) routed to configured fallback #{}", priority, ticket_type, idx);
        return Some(idx);
    }

    let any = agents.first_available();
    if any.is_some() {
        debug!("({}, {}) routed to first available agent", priority, ticket_type);
    }
    any
}

/// Assign whatever queued tickets now fit. Each queued ticket is looked at
/// exactly once; one that still does not fit stays put without blocking the
/// tickets behind it.
fn drain(policy: &RoutingPolicy, state: &mut DispatchState) -> Vec<Assignment> {
    let DispatchState {
        tickets,
        agents,
        queues,
    } = state;
    let mut newly_assigned = Vec::new();

    for tier in Priority::BY_URGENCY {
        queues.retain_tier(tier, |ticket_id| {
            let Some(ticket) = tickets.get_mut(ticket_id) else {
                warn!("Dropping unknown ticket {} from the {} queue", ticket_id, tier);
                return false;
            };
            if ticket.status != TicketStatus::Open {
                warn!("Dropping {} ticket {} from the {} queue", ticket.status, ticket_id, tier);
                return false;
            }

            let Some(idx) = decide(policy, agents, ticket.priority, ticket.ticket_type) else {
                return true;
            };
            if !agents.assign(idx, ticket_id) {
                return true;
            }
            let Some(agent) = agents.get(idx) else {
                return true;
            };

            ticket.assign(agent.name(), agent.external_id());
            info!("Queued ticket {} assigned to {}", ticket_id, agent.name());
            newly_assigned.push(Assignment {
                ticket_id: ticket_id.clone(),
                agent: agent.name().to_string(),
                agent_id: agent.external_id().to_string(),
            });
            false
        });
    }

    if !newly_assigned.is_empty() {
        debug!("Drain assigned {} ticket(s)", newly_assigned.len());
    }
    newly_assigned
}
