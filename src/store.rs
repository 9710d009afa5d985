use crate::char::{Character, SerializableChar};
use crate::error::{DocError, DocResult};
use crate::pid::PositionId;

/// The dense ordered store of characters.
///
/// Maintains ascending PID order and PID uniqueness incrementally via
/// binary-search insertion; a flat `Vec` is sufficient at the scale this
/// service targets.
#[derive(Debug, Default)]
pub struct CharacterStore {
    chars: Vec<Character>,
}

impl CharacterStore {
    pub fn new() -> Self {
        Self { chars: Vec::new() }
    }

    fn position_of(&self, pid: &PositionId) -> Result<usize, usize> {
        self.chars.binary_search_by(|c| c.pid.cmp(pid))
    }

    /// Inserts `c` in PID order. A no-op if a character with an equal PID is
    /// already present, so PIDs stay unique.
    pub fn insert_char(&mut self, c: Character) {
        match self.position_of(&c.pid) {
            Ok(_) => {}
            Err(insert_at) => self.chars.insert(insert_at, c),
        }
    }

    pub fn contains(&self, pid: &PositionId) -> bool {
        self.position_of(pid).is_ok()
    }

    /// Marks the character at `id` as tombstoned. Tombstoning is monotone:
    /// setting an already-tombstoned character to tombstoned again is a
    /// harmless no-op.
    pub fn tombstone(&mut self, id: &PositionId) -> DocResult<()> {
        match self.position_of(id) {
            Ok(idx) => {
                self.chars[idx].tombstone = true;
                Ok(())
            }
            Err(_) => Err(DocError::NotFound { id: id.clone() }),
        }
    }

    /// Concatenates visible (non-tombstoned) values in PID order.
    pub fn to_string_content(&self) -> String {
        self.chars
            .iter()
            .filter(|c| !c.tombstone)
            .map(|c| c.value)
            .collect()
    }

    /// Enumerates every stored character, including tombstones, in PID order.
    pub fn raw_chars(&self) -> Vec<SerializableChar> {
        self.chars.iter().map(SerializableChar::from).collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    #[cfg(test)]
    pub fn is_sorted(&self) -> bool {
        self.chars.windows(2).all(|w| w[0].pid < w[1].pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(path: &[u32], site: &str, counter: u64, value: char) -> Character {
        Character::new(PositionId::new(path.to_vec(), site, counter), value)
    }

    #[test]
    fn insert_keeps_ascending_order() {
        let mut store = CharacterStore::new();
        store.insert_char(ch(&[5], "A", 1, 'b'));
        store.insert_char(ch(&[1], "A", 2, 'a'));
        store.insert_char(ch(&[9], "A", 3, 'c'));
        assert!(store.is_sorted());
        assert_eq!(store.to_string_content(), "abc");
    }

    #[test]
    fn duplicate_pid_insert_is_noop() {
        let mut store = CharacterStore::new();
        store.insert_char(ch(&[1], "A", 1, 'a'));
        store.insert_char(ch(&[1], "A", 1, 'z'));
        assert_eq!(store.len(), 1);
        assert_eq!(store.to_string_content(), "a");
    }

    #[test]
    fn tombstone_hides_from_content_but_keeps_the_slot() {
        let mut store = CharacterStore::new();
        let pid = PositionId::new(vec![1], "A", 1);
        store.insert_char(Character::new(pid.clone(), 'x'));
        store.tombstone(&pid).unwrap();
        assert_eq!(store.to_string_content(), "");
        assert_eq!(store.raw_chars().len(), 1);
        assert!(store.raw_chars()[0].t);
    }

    #[test]
    fn tombstone_of_missing_pid_errors() {
        let mut store = CharacterStore::new();
        let pid = PositionId::new(vec![1], "A", 1);
        assert_eq!(store.tombstone(&pid), Err(DocError::NotFound { id: pid }));
    }

    #[test]
    fn raw_chars_round_trips_into_an_empty_store() {
        let mut store = CharacterStore::new();
        store.insert_char(ch(&[1], "A", 1, 'h'));
        store.insert_char(ch(&[2], "A", 2, 'i'));
        store.tombstone(&PositionId::new(vec![1], "A", 1)).unwrap();

        let raw = store.raw_chars();
        let mut replayed = CharacterStore::new();
        for entry in &raw {
            let pid = PositionId::new(entry.path.clone(), entry.site.clone(), entry.counter);
            let value = entry.val.chars().next().unwrap();
            let mut c = Character::new(pid, value);
            c.tombstone = entry.t;
            replayed.insert_char(c);
        }

        assert_eq!(replayed.to_string_content(), store.to_string_content());
    }
}
