// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Snapshot diffing for one entity pool.
//!
//! A tracked name is either `Pending` (its subscribe call has been issued
//! but not resolved) or `Active`. Pending names count as tracked, so a
//! second snapshot arriving while a subscribe is in flight never starts a
//! duplicate subscription. Every attempt carries a number; a completion
//! whose number no longer matches belongs to a name that was removed (and
//! possibly re-added) in the meantime and must be discarded.

use std::collections::{BTreeMap, BTreeSet};

/// Subscription phase of one tracked name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Subscribe call in flight.
    Pending { attempt: u64 },
    /// Subscription live.
    Active,
}

/// Outcome of a resolved subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    /// The name is now active; keep the subscription.
    Admitted,
    /// The attempt is outdated; release the subscription.
    Stale,
}

/// Names to subscribe and to tear down after a snapshot.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Diff {
    /// Present in the snapshot, not tracked yet (sorted).
    pub added: Vec<String>,
    /// Tracked, absent from the snapshot (sorted).
    pub removed: Vec<String>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Tracking set of one pool (devices or macros).
#[derive(Debug, Default)]
pub(crate) struct Reconciler {
    phases: BTreeMap<String, Phase>,
    next_attempt: u64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares the names of a snapshot with the tracked names.
    pub fn diff(&self, current: &BTreeSet<String>) -> Diff {
        Diff {
            added: current
                .iter()
                .filter(|name| !self.phases.contains_key(*name))
                .cloned()
                .collect(),
            removed: self
                .phases
                .keys()
                .filter(|name| !current.contains(*name))
                .cloned()
                .collect(),
        }
    }

    /// Starts tracking `name` as pending and returns the attempt number.
    pub fn begin(&mut self, name: &str) -> u64 {
        self.next_attempt += 1;
        let attempt = self.next_attempt;
        self.phases
            .insert(name.to_string(), Phase::Pending { attempt });
        attempt
    }

    /// Resolves a successful subscribe call.
    pub fn complete(&mut self, name: &str, attempt: u64) -> Completion {
        match self.phases.get_mut(name) {
            Some(phase) if *phase == (Phase::Pending { attempt }) => {
                *phase = Phase::Active;
                Completion::Admitted
            }
            _ => Completion::Stale,
        }
    }

    /// Resolves a failed subscribe call, forgetting the name so that a later
    /// snapshot retries it.
    ///
    /// Returns `true` if the attempt was still current.
    pub fn fail(&mut self, name: &str, attempt: u64) -> bool {
        if self.phases.get(name) == Some(&Phase::Pending { attempt }) {
            self.phases.remove(name);
            true
        } else {
            false
        }
    }

    /// Stops tracking `name`, returning its phase.
    pub fn remove(&mut self, name: &str) -> Option<Phase> {
        self.phases.remove(name)
    }

    #[cfg(test)]
    pub fn phase(&self, name: &str) -> Option<Phase> {
        self.phases.get(name).copied()
    }

    pub fn active_names(&self) -> Vec<String> {
        self.names_where(|phase| phase == Phase::Active)
    }

    pub fn pending_names(&self) -> Vec<String> {
        self.names_where(|phase| matches!(phase, Phase::Pending { .. }))
    }

    fn names_where(&self, keep: impl Fn(Phase) -> bool) -> Vec<String> {
        self.phases
            .iter()
            .filter(|(_, phase)| keep(**phase))
            .map(|(name, _)| name.clone())
            .collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn clear(&mut self) {
        self.phases.clear();
    }
}
