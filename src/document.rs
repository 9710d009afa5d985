use crate::allocator::generate_position_between;
use crate::char::{Character, SerializableChar};
use crate::clock::LogicalClock;
use crate::error::{DocError, DocResult};
use crate::pid::PositionId;
use crate::store::CharacterStore;
use std::collections::HashSet;

fn insert_op_id(pid: &PositionId) -> String {
    format!("i-{}-{}", pid.site, pid.counter)
}

fn delete_op_id(pid: &PositionId) -> String {
    format!("d-{}-{}", pid.site, pid.counter)
}

/// The shared CRDT document: the ordered store plus the replication
/// front-end that makes remote operations idempotent and commutative
/// (spec §3, §4.4).
#[derive(Debug)]
pub struct Document {
    store: CharacterStore,
    clock: LogicalClock,
    seen: HashSet<String>,
    /// Deletes that arrived before their matching insert (spec §9's Open
    /// Question, resolved as "record-tombstone-then-apply-on-arrival"):
    /// applied the moment the insert for the same PID shows up.
    pending_tombstones: HashSet<PositionId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            store: CharacterStore::new(),
            clock: LogicalClock::new(),
            seen: HashSet::new(),
            pending_tombstones: HashSet::new(),
        }
    }

    pub fn clock_value(&self) -> u64 {
        self.clock.value()
    }

    pub fn tick(&mut self) -> u64 {
        self.clock.tick()
    }

    // -- Document store surface (spec §4.3) ---------------------------------

    /// Mints a fresh PID between `left` and `right` and inserts the character
    /// locally. The caller supplies a fresh `counter` (obtained via
    /// [`Document::tick`]) and is responsible for `left < right`.
    pub fn insert_local(
        &mut self,
        left: &PositionId,
        right: &PositionId,
        value: char,
        site: &str,
        counter: u64,
    ) -> DocResult<Character> {
        let pid = generate_position_between(left, right, site, counter)?;
        let c = Character::new(pid, value);
        self.store.insert_char(c.clone());
        Ok(c)
    }

    pub fn insert_char(&mut self, c: Character) {
        self.store.insert_char(c);
    }

    /// Tombstones the character at `id`. Errs with `NotFound` if absent.
    pub fn delete_local(&mut self, id: &PositionId) -> DocResult<()> {
        self.store.tombstone(id)
    }

    pub fn to_string_content(&self) -> String {
        self.store.to_string_content()
    }

    pub fn raw_chars(&self) -> Vec<SerializableChar> {
        self.store.raw_chars()
    }

    // -- Replication front-end (spec §4.4) ----------------------------------

    /// Idempotently applies a remote insert. Duplicate delivery of the same
    /// `(site, counter)` is a no-op beyond the first (I4).
    pub fn apply_remote_insert(&mut self, c: Character) {
        let op_id = insert_op_id(&c.pid);
        if self.seen.contains(&op_id) {
            return;
        }
        self.seen.insert(op_id);

        self.clock.merge(c.pid.counter);
        let pid = c.pid.clone();
        self.store.insert_char(c);

        if self.pending_tombstones.remove(&pid) {
            // A delete for this PID arrived first; apply it now.
            let _ = self.store.tombstone(&pid);
        }
    }

    /// Idempotently applies a remote delete. If the target is not yet
    /// present, the delete is remembered and applied as soon as the matching
    /// insert arrives, rather than being dropped.
    pub fn apply_remote_delete(&mut self, id: PositionId) {
        let op_id = delete_op_id(&id);
        if self.seen.contains(&op_id) {
            return;
        }
        self.seen.insert(op_id);

        self.clock.merge(id.counter);
        match self.store.tombstone(&id) {
            Ok(()) => {}
            Err(DocError::NotFound { .. }) => {
                self.pending_tombstones.insert(id);
            }
            Err(_) => unreachable!("tombstone only returns NotFound"),
        }
    }
}
