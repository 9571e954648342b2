//! Component registry.
//!
//! Maps component ids to their current health record. The registry itself is
//! not synchronized; the monitor owns it behind a single mutex so every
//! mutation is serialized and every snapshot observes a consistent state.

use std::collections::HashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::aggregator;
use super::model::{AggregateSnapshot, ComponentHealth, HealthStatus};
use super::traits::CheckRef;

/// Recurring check attached to a registration.
///
/// Dropping it cancels the timer task.
pub(crate) struct ScheduledCheck {
    pub check: CheckRef,
    handle: JoinHandle<()>,
}

impl ScheduledCheck {
    pub fn new(check: CheckRef, handle: JoinHandle<()>) -> Self {
        Self { check, handle }
    }
}

impl Drop for ScheduledCheck {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub(crate) struct RegistryEntry {
    pub health: ComponentHealth,
    /// Monotonic time of the last status assignment.
    pub updated_at: Instant,
    /// Distinguishes this entry from earlier entries under the same id.
    pub generation: u64,
    pub scheduled: Option<ScheduledCheck>,
}

/// Check that can be invoked outside the registry lock.
pub(crate) struct CheckTarget {
    pub component_id: String,
    pub generation: u64,
    pub check: CheckRef,
}

#[derive(Default)]
pub(crate) struct ComponentRegistry {
    entries: HashMap<String, RegistryEntry>,
    next_generation: u64,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, component_id: &str) -> bool {
        self.entries.contains_key(component_id)
    }

    pub fn get(&self, component_id: &str) -> Option<&ComponentHealth> {
        self.entries.get(component_id).map(|e| &e.health)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    /// True if `component_id` is still the entry a check was started for.
    pub fn is_current(&self, component_id: &str, generation: u64) -> bool {
        self.entries
            .get(component_id)
            .is_some_and(|e| e.generation == generation)
    }

    /// Inserts the initial `registered` record.
    ///
    /// Returns the entry generation, or `None` if the id is already present.
    pub fn register(&mut self, component_id: &str) -> Option<u64> {
        if self.contains(component_id) {
            return None;
        }
        let generation = self.bump_generation();
        self.entries.insert(
            component_id.to_string(),
            RegistryEntry {
                health: ComponentHealth::registered(component_id),
                updated_at: Instant::now(),
                generation,
                scheduled: None,
            },
        );
        Some(generation)
    }

    /// Attaches a recurring check to an existing entry.
    ///
    /// The check is dropped (and its timer cancelled) if the entry is gone.
    pub fn schedule(&mut self, component_id: &str, scheduled: ScheduledCheck) -> bool {
        match self.entries.get_mut(component_id) {
            Some(entry) => {
                entry.scheduled = Some(scheduled);
                true
            }
            None => false,
        }
    }

    /// Removes an entry, cancelling its timer. Returns the last record.
    pub fn unregister(&mut self, component_id: &str) -> Option<ComponentHealth> {
        self.entries.remove(component_id).map(|e| e.health)
    }

    /// Replaces the record for `record.component_id`, creating the entry if needed.
    ///
    /// Returns the previous status, `None` for a new entry.
    pub fn upsert(&mut self, record: ComponentHealth) -> Option<HealthStatus> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get_mut(&record.component_id) {
            let previous = entry.health.status;
            entry.health = record;
            entry.updated_at = now;
            return Some(previous);
        }

        let generation = self.bump_generation();
        self.entries.insert(
            record.component_id.clone(),
            RegistryEntry {
                health: record,
                updated_at: now,
                generation,
                scheduled: None,
            },
        );
        None
    }

    /// Components that carry a check callback.
    pub fn check_targets(&self) -> Vec<CheckTarget> {
        self.entries
            .iter()
            .filter_map(|(id, entry)| {
                entry.scheduled.as_ref().map(|s| CheckTarget {
                    component_id: id.clone(),
                    generation: entry.generation,
                    check: s.check.clone(),
                })
            })
            .collect()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Past records of a component.
    ///
    /// Only the current record is kept, so this returns at most one entry.
    pub fn history(&self, component_id: &str, limit: usize) -> Vec<ComponentHealth> {
        self.get(component_id)
            .into_iter()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> AggregateSnapshot {
        aggregator::snapshot(self.entries.values().map(|e| &e.health))
    }

    /// Removes every entry, cancelling all check timers.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}
