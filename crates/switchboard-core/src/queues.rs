//! FCFS waiting queues, one per priority tier

use serde::Serialize;
use std::collections::VecDeque;

use crate::types::Priority;

/// Ids of tickets waiting for capacity, in insertion order per tier
#[derive(Debug, Default)]
pub struct PriorityQueues {
    high: VecDeque<String>,
    medium: VecDeque<String>,
    low: VecDeque<String>,
}

/// Queue contents by tier
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct QueueSnapshot {
    pub high: Vec<String>,
    pub medium: Vec<String>,
    pub low: Vec<String>,
}

impl PriorityQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(&self, priority: Priority) -> &VecDeque<String> {
        match priority {
            Priority::High => &self.high,
            Priority::Medium => &self.medium,
            Priority::Low => &self.low,
        }
    }

    fn tier_mut(&mut self, priority: Priority) -> &mut VecDeque<String> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Medium => &mut self.medium,
            Priority::Low => &mut self.low,
        }
    }

    pub fn push(&mut self, priority: Priority, ticket_id: &str) {
        self.tier_mut(priority).push_back(ticket_id.to_string());
    }

    /// Remove a ticket from its tier. Returns whether it was queued.
    pub fn remove(&mut self, priority: Priority, ticket_id: &str) -> bool {
        let tier = self.tier_mut(priority);
        match tier.iter().position(|t| t == ticket_id) {
            Some(pos) => {
                tier.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, priority: Priority, ticket_id: &str) -> bool {
        self.tier(priority).iter().any(|t| t == ticket_id)
    }

    /// Visit every ticket of a tier once, front to back, keeping only those
    /// for which `keep` returns true. Relative order of kept tickets is preserved.
    pub fn retain_tier<F>(&mut self, priority: Priority, keep: F)
    where
        F: FnMut(&String) -> bool,
    {
        self.tier_mut(priority).retain(keep);
    }

    pub fn len(&self, priority: Priority) -> usize {
        self.tier(priority).len()
    }

    /// Tickets waiting across all tiers
    pub fn total(&self) -> usize {
        self.high.len() + self.medium.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            high: self.high.iter().cloned().collect(),
            medium: self.medium.iter().cloned().collect(),
            low: self.low.iter().cloned().collect(),
        }
    }

    pub fn clear(&mut self) {
        self.high.clear();
        self.medium.clear();
        self.low.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_insertion_order() {
        let mut q = PriorityQueues::new();
        q.push(Priority::Low, "a");
        q.push(Priority::Low, "b");
        q.push(Priority::High, "c");
        assert_eq!(q.snapshot().low, vec!["a", "b"]);
        assert_eq!(q.snapshot().high, vec!["c"]);
        assert_eq!(q.total(), 3);
    }

    #[test]
    fn test_remove_from_middle() {
        let mut q = PriorityQueues::new();
        for id in ["a", "b", "c"] {
            q.push(Priority::Medium, id);
        }
        assert!(q.remove(Priority::Medium, "b"));
        assert_eq!(q.snapshot().medium, vec!["a", "c"]);
        assert!(!q.remove(Priority::Medium, "b"));
        // wrong tier is a miss
        assert!(!q.remove(Priority::Low, "a"));
    }

    #[test]
    fn test_retain_tier_visits_in_order_once() {
        let mut q = PriorityQueues::new();
        for id in ["a", "b", "c", "d"] {
            q.push(Priority::High, id);
        }
        let mut seen = Vec::new();
        q.retain_tier(Priority::High, |id| {
            seen.push(id.clone());
            id == "b" || id == "d"
        });
        assert_eq!(seen, vec!["a", "b", "c", "d"]);
        assert_eq!(q.snapshot().high, vec!["b", "d"]);
    }

    #[test]
    fn test_clear() {
        let mut q = PriorityQueues::new();
        q.push(Priority::High, "a");
        q.push(Priority::Low, "b");
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.snapshot(), QueueSnapshot::default());
    }
}
