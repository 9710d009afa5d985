use crate::pid::PositionId;
use snafu::Snafu;

/// Errors surfaced by the CRDT core (spec §7).
///
/// Remote application (`apply_remote_insert`/`apply_remote_delete`) never
/// returns these to its caller — duplicates, reorderings, and deletes of
/// not-yet-inserted PIDs are absorbed. These variants are only raised by the
/// local-editing entrypoints, where they indicate a genuine programmer error
/// or an unavailable source of randomness.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum DocError {
    #[snafu(display("no character found with position id {id:?}"))]
    NotFound { id: PositionId },

    #[snafu(display("invalid neighbours: left {left:?} is not strictly less than right {right:?}"))]
    InvalidNeighbours { left: PositionId, right: PositionId },

    #[snafu(display("cryptographic randomness source failed"))]
    RandomSourceFailure,
}

pub type DocResult<T> = Result<T, DocError>;
