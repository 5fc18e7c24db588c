// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Insertion-ordered store of live entities of one kind.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use tl_core::{is_older, Descriptor};

use super::live::Live;
use crate::api::{fetch_pages, Params, Requester};
use crate::error::Result;

/// Vacant slots tolerated before the arena is compacted.
const COMPACT_THRESHOLD: usize = 32;

/// How an upsert changed the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// A new entity was appended.
    Inserted,
    /// An existing entity's snapshot was replaced.
    Updated,
    /// The incoming snapshot is older than the held one and was ignored.
    Stale,
}

/// Identifier to live entity, in discovery order.
///
/// Slots are an arena: an entity keeps its slot for as long as it is in the
/// store, and removal leaves a hole that is reclaimed by compaction.
pub struct EntityStore<D: Descriptor> {
    slots: Vec<Option<Live<D>>>,
    index: HashMap<String, usize>,
    vacant: usize,
}

impl<D: Descriptor> Default for EntityStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Descriptor> EntityStore<D> {
    pub fn new() -> Self {
        EntityStore {
            slots: Vec::new(),
            index: HashMap::new(),
            vacant: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, sid: &str) -> bool {
        self.index.contains_key(sid)
    }

    pub fn get(&self, sid: &str) -> Option<&Live<D>> {
        self.index
            .get(sid)
            .and_then(|&pos| self.slots.get(pos))
            .and_then(Option::as_ref)
    }

    /// Live entities in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Live<D>> {
        self.slots.iter().flatten()
    }

    /// Identifiers in discovery order.
    pub fn sids(&self) -> Vec<String> {
        self.iter().map(|live| live.sid().to_string()).collect()
    }

    /// Inserts a new entity or replaces the snapshot of a known one.
    ///
    /// A known entity keeps its identity. A snapshot older than the held one
    /// is ignored: by `version` when both carry one, otherwise by
    /// `date_updated`.
    pub fn upsert(&mut self, descriptor: D) -> (Live<D>, Change) {
        if let Some(live) = self.get(descriptor.sid()).cloned() {
            let held = live.snapshot();
            if is_older(&descriptor, &*held) {
                debug!(
                    kind = %D::KIND,
                    sid = live.sid(),
                    held_version = ?held.version(),
                    incoming_version = ?descriptor.version(),
                    held_updated = %held.date_updated(),
                    incoming_updated = %descriptor.date_updated(),
                    "ignoring stale snapshot"
                );
                return (live, Change::Stale);
            }
            live.replace(descriptor);
            return (live, Change::Updated);
        }

        let live = Live::new(descriptor);
        self.index.insert(live.sid().to_string(), self.slots.len());
        self.slots.push(Some(live.clone()));
        (live, Change::Inserted)
    }

    /// Decodes a raw record and upserts it.
    pub fn upsert_raw(&mut self, raw: Value) -> Result<(Live<D>, Change)> {
        let descriptor = D::from_value(raw)?;
        Ok(self.upsert(descriptor))
    }

    /// Removes an entity. Idempotent; returns the entity if one was removed.
    pub fn remove(&mut self, sid: &str) -> Option<Live<D>> {
        let pos = self.index.remove(sid)?;
        let live = self.slots.get_mut(pos).and_then(Option::take);
        if live.is_some() {
            self.vacant += 1;
            self.maybe_compact();
        }
        live
    }

    /// Removes every entity whose identifier is not in `keep`, returning
    /// the removed entities in discovery order.
    pub fn retain_only(&mut self, keep: &HashSet<String>) -> Vec<Live<D>> {
        let doomed: Vec<String> = self
            .iter()
            .filter(|live| !keep.contains(live.sid()))
            .map(|live| live.sid().to_string())
            .collect();
        doomed.iter().filter_map(|sid| self.remove(sid)).collect()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.vacant = 0;
    }

    /// Reads every page of `path` and upserts each record in arrival order.
    ///
    /// Returns the fetched entities with how each changed the store. An
    /// empty listing is not an error.
    pub async fn fetch_all<R: Requester + ?Sized>(
        &mut self,
        requester: &R,
        path: &str,
        query: &Params,
        page_size: u32,
    ) -> Result<Vec<(Live<D>, Change)>> {
        let records = fetch_pages(requester, path, query, page_size).await?;
        let mut fetched = Vec::with_capacity(records.len());
        for raw in records {
            fetched.push(self.upsert_raw(raw)?);
        }
        debug!(kind = %D::KIND, count = fetched.len(), "fetched all");
        Ok(fetched)
    }

    fn maybe_compact(&mut self) {
        if self.vacant < COMPACT_THRESHOLD || self.vacant * 2 < self.slots.len() {
            return;
        }
        self.slots.retain(Option::is_some);
        self.index.clear();
        for (pos, live) in self.slots.iter().flatten().enumerate() {
            self.index.insert(live.sid().to_string(), pos);
        }
        self.vacant = 0;
    }
}

#[cfg(test)]
#[path = "entity_store_tests.rs"]
mod tests;
