use crate::pid::PositionId;
use serde::{Deserialize, Serialize};

/// A single stored unit of the document: a character paired with its
/// position identifier and a tombstone flag (spec §3).
///
/// A tombstoned character is retained — never removed from the store — so
/// that later insertions can still compute correct neighbour identities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Character {
    pub pid: PositionId,
    pub value: char,
    pub tombstone: bool,
}

impl Character {
    pub fn new(pid: PositionId, value: char) -> Self {
        Self {
            pid,
            value,
            tombstone: false,
        }
    }
}

impl Ord for Character {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.pid.cmp(&other.pid)
    }
}

impl PartialOrd for Character {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Wire representation of a [`Character`] for `raw_chars` / snapshot
/// responses, field-named to match spec §6's envelope exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerializableChar {
    pub path: Vec<u32>,
    pub val: String,
    pub site: String,
    pub counter: u64,
    pub t: bool,
}

impl From<&Character> for SerializableChar {
    fn from(c: &Character) -> Self {
        Self {
            path: c.pid.path.clone(),
            val: c.value.to_string(),
            site: c.pid.site.clone(),
            counter: c.pid.counter,
            t: c.tombstone,
        }
    }
}
