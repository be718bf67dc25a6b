//! Name lookups and surrogate ids shared by the converters.
use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicI64, Ordering},
};

use records::RecordId;

use crate::{DuplicateNameError, ReferenceResolutionError, schema::EntityKind};

/// Hands out surrogate ids counting down from `i64::MAX`.
///
/// Ids are unique and strictly decreasing in assignment order, also when the
/// sequence is shared across threads.
#[derive(Debug)]
pub struct IdSequence(AtomicI64);

impl IdSequence {
    pub fn new() -> Self {
        Self(AtomicI64::new(i64::MAX))
    }

    pub fn next_id(&self) -> RecordId {
        RecordId(self.0.fetch_sub(1, Ordering::SeqCst))
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-run lookup from the name written in the workbook to the id assigned
/// to the record converted from it.
#[derive(Clone, Debug)]
pub struct NameRegistry {
    kind: EntityKind,
    ids: HashMap<String, RecordId>,
    preferred: HashSet<String>,
}

impl NameRegistry {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            ids: HashMap::new(),
            preferred: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Registers `name`. The first registration wins.
    pub fn register(&mut self, name: &str, id: RecordId) -> Result<(), DuplicateNameError> {
        let name = name.trim();
        if self.ids.contains_key(name) {
            return Err(DuplicateNameError {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        self.ids.insert(name.to_string(), id);
        Ok(())
    }

    /// Registers `name` for a kind whose records may share a name. The first
    /// preferred registration wins, the first one when none is preferred.
    pub fn register_shared(&mut self, name: &str, id: RecordId, preferred: bool) {
        let name = name.trim();
        if preferred && !self.preferred.contains(name) {
            self.preferred.insert(name.to_string());
            self.ids.insert(name.to_string(), id);
        } else {
            self.ids.entry(name.to_string()).or_insert(id);
        }
    }

    pub fn resolve(&self, name: &str) -> Result<RecordId, ReferenceResolutionError> {
        let name = name.trim();
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| ReferenceResolutionError {
                kind: self.kind,
                name: name.to_string(),
            })
    }
}
