//! Advisory classification
//!
//! A classifier scores a (priority, type) pair and suggests which agent
//! should take it. The output is attached to tickets as metadata only; the
//! routing engine never reads it when deciding an assignment, and works the
//! same with no classifier installed.

pub mod mlp;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DispatchError, Result};
use crate::types::{Priority, TicketType};

pub use mlp::{MlpClassifier, MlpWeights};

/// Classifier output for one (priority, type) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Advisory {
    pub predicted_agent: String,
    /// Probability of the predicted agent, in [0, 1]
    pub confidence: f64,
    /// Agent name → probability; sums to 1
    pub probabilities: BTreeMap<String, f64>,
}

impl Advisory {
    /// Build an advisory from a probability vector aligned with `labels`.
    /// Ties resolve to the earliest label.
    pub fn from_distribution(labels: &[String], probs: &[f64]) -> Result<Self> {
        if labels.is_empty() || labels.len() != probs.len() {
            return Err(DispatchError::Model(format!(
                "{} labels for {} probabilities",
                labels.len(),
                probs.len()
            )));
        }

        let mut best = 0;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = i;
            }
        }

        Ok(Self {
            predicted_agent: labels[best].clone(),
            confidence: probs[best],
            probabilities: labels.iter().cloned().zip(probs.iter().copied()).collect(),
        })
    }
}

/// A stateless scorer. Implementations must be cheap and must not block,
/// since the engine may call them on every ticket creation.
pub trait AdvisoryClassifier: Send + Sync {
    fn score(&self, priority: Priority, ticket_type: TicketType) -> Result<Advisory>;

    /// Short label for logs
    fn name(&self) -> &str {
        "classifier"
    }
}

/// Result of a classification request made without creating a ticket
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Classification {
    pub priority: Priority,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub predicted_agent: String,
    /// External id of the predicted agent, when it is a known agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<TicketType>,
    pub confidence: f64,
    pub probabilities: BTreeMap<String, f64>,
}
