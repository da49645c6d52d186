use std::collections::HashMap;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use qar_proto::sync::{FieldTag, PanelPatch, Stamp, VolumePatch};
use qar_proto::{AppVolume, GuiPanel, PanelId, VolumeId};

/// Snapshot handle returned by enumeration.
///
/// Handles are independently reference-counted copies: they stay valid and
/// queryable after the live entity is removed, until the caller drops them.
pub type Handle<T> = Arc<T>;

/// An entity document that can live in a replicated table.
pub trait Replicated: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + std::hash::Hash + Send + Sync + 'static;
    type Patch: Clone + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
    fn apply(&mut self, patch: &Self::Patch);
    fn tag(patch: &Self::Patch) -> FieldTag;
}

impl Replicated for GuiPanel {
    type Id = PanelId;
    type Patch = PanelPatch;

    fn id(&self) -> PanelId {
        self.id
    }

    fn apply(&mut self, patch: &PanelPatch) {
        match patch {
            PanelPatch::Name(name) => self.display_name = name.clone(),
            PanelPatch::Pose(pose) => self.pose = *pose,
            PanelPatch::Size(size) => self.size = *size,
            PanelPatch::State(state) => self.state = *state,
            PanelPatch::Uri(uri) => self.uri = uri.clone(),
        }
    }

    fn tag(patch: &PanelPatch) -> FieldTag {
        patch.tag()
    }
}

impl Replicated for AppVolume {
    type Id = VolumeId;
    type Patch = VolumePatch;

    fn id(&self) -> VolumeId {
        self.id
    }

    fn apply(&mut self, patch: &VolumePatch) {
        match patch {
            VolumePatch::Name(name) => self.display_name = name.clone(),
            VolumePatch::Pose(pose) => self.pose = *pose,
            VolumePatch::Size(size) => self.size = *size,
            VolumePatch::Lifetime(lifetime) => self.lifetime = *lifetime,
        }
    }

    fn tag(patch: &VolumePatch) -> FieldTag {
        patch.tag()
    }
}

/// One record of a replica: the document plus the stamp that last wrote
/// each field. A field without an entry was last written at creation.
#[derive(Debug, Clone)]
struct Record<T> {
    doc: T,
    created: Stamp,
    field_stamps: HashMap<FieldTag, Stamp>,
}

/// Portable copy of a table used to bootstrap late joiners.
#[derive(Debug, Clone)]
pub struct TableSnapshot<T: Replicated> {
    records: Vec<(T, Stamp, HashMap<FieldTag, Stamp>)>,
    tombstones: Vec<T::Id>,
}

/// One peer's replica of a per-kind entity table.
///
/// Internally synchronized: concurrent applies from the local API and the
/// propagation task are linearizable per entity (the shard lock of the
/// record map orders them). Cross-entity operations are not transactional.
#[derive(Debug)]
pub struct EntityTable<T: Replicated> {
    records: DashMap<T::Id, Record<T>>,
    /// Ids that were removed. A removal wins over any concurrent field
    /// write, so a late op for a tombstoned id is swallowed rather than
    /// resurrecting the entity.
    tombstones: DashSet<T::Id>,
}

impl<T: Replicated> Default for EntityTable<T> {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
            tombstones: DashSet::new(),
        }
    }
}

impl<T: Replicated> EntityTable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an add op. Returns `false` when the id is tombstoned or
    /// already present (a redelivered op — adds are idempotent).
    pub fn apply_add(&self, doc: T, stamp: Stamp) -> bool {
        let id = doc.id();
        if self.tombstones.contains(&id) || self.records.contains_key(&id) {
            return false;
        }
        self.records.insert(
            id,
            Record {
                doc,
                created: stamp,
                field_stamps: HashMap::new(),
            },
        );
        true
    }

    /// Apply a single-field write. Returns `false` only when the id is
    /// unknown and was never removed; a write against a tombstoned id is
    /// swallowed and reported as found.
    pub fn apply_set(&self, id: T::Id, patch: &T::Patch, stamp: Stamp) -> bool {
        match self.records.get_mut(&id) {
            Some(mut record) => {
                let tag = T::tag(patch);
                let last = record
                    .field_stamps
                    .get(&tag)
                    .copied()
                    .unwrap_or(record.created);
                if stamp > last {
                    record.doc.apply(patch);
                    record.field_stamps.insert(tag, stamp);
                }
                true
            }
            None => self.tombstones.contains(&id),
        }
    }

    /// Apply a removal. Returns `false` when the id is unknown.
    pub fn apply_remove(&self, id: T::Id) -> bool {
        if self.tombstones.contains(&id) {
            return true;
        }
        if self.records.remove(&id).is_none() {
            return false;
        }
        self.tombstones.insert(id);
        true
    }

    #[must_use]
    pub fn contains(&self, id: T::Id) -> bool {
        self.records.contains_key(&id)
    }

    /// Live entity count; removed entities are never counted.
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Snapshot of one entity.
    #[must_use]
    pub fn snapshot(&self, id: T::Id) -> Option<Handle<T>> {
        self.records.get(&id).map(|r| Arc::new(r.doc.clone()))
    }

    /// Point-in-time snapshot of up to `capacity` entities, in the order
    /// of the snapshot pass. Order is not guaranteed stable across calls.
    #[must_use]
    pub fn list(&self, capacity: usize) -> Vec<Handle<T>> {
        self.records
            .iter()
            .take(capacity)
            .map(|r| Arc::new(r.doc.clone()))
            .collect()
    }

    /// Export the whole table, stamps included, for replica bootstrap.
    #[must_use]
    pub fn export(&self) -> TableSnapshot<T> {
        TableSnapshot {
            records: self
                .records
                .iter()
                .map(|r| (r.doc.clone(), r.created, r.field_stamps.clone()))
                .collect(),
            tombstones: self.tombstones.iter().map(|id| *id).collect(),
        }
    }

    /// Merge an exported snapshot into this table.
    ///
    /// Idempotent and safe to run concurrently with op application:
    /// tombstones always win, unknown records are inserted whole, and
    /// records already present are left to converge through ops.
    pub fn import(&self, snapshot: TableSnapshot<T>) {
        for id in snapshot.tombstones {
            self.records.remove(&id);
            self.tombstones.insert(id);
        }
        for (doc, created, field_stamps) in snapshot.records {
            let id = doc.id();
            if self.tombstones.contains(&id) {
                continue;
            }
            if let dashmap::mapref::entry::Entry::Vacant(entry) = self.records.entry(id) {
                entry.insert(Record {
                    doc,
                    created,
                    field_stamps,
                });
            }
        }
    }
}
