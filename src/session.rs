use serde::{Deserialize, Serialize};

use crate::float::Float;

/// The one or two consecutive time slices a session currently spans, as
/// positions into the owning collection's slice list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bracket
{
    /// The session time coincides with one key.
    Single(usize),
    /// The session time lies strictly between two consecutive keys.
    Pair(usize, usize),
}

impl Bracket
{
    /// Slice positions covered, ascending.
    pub fn positions(&self) -> std::iter::Take<std::array::IntoIter<usize, 2>> {
        match *self {
            Bracket::Single(position) => [position, position].into_iter().take(1),
            Bracket::Pair(lower, upper) => [lower, upper].into_iter().take(2),
        }
    }
}

/// Immutable snapshot of a query time plus its temporal bracket.
///
/// Implementors decide how bracketed slice data is reached (held in memory,
/// fetched lazily from external storage, ...); the owning collection only
/// requires the time, the bracket, and a constructor. Advancing time never
/// mutates a session: [`step_to`](crate::TimeVaryingVolumetricGridLookupField::step_to)
/// produces a new value, so independent copies stay safe to query from
/// multiple call sites.
pub trait Session<T: Float>: Clone
{
    fn new(time: T, bracket: Bracket) -> Self;

    /// The current query time.
    fn time(&self) -> T;

    /// Positions of the bracketing slices in the owning collection.
    fn bracket(&self) -> Bracket;
}

/// Session variant holding its bracket directly in memory.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InMemorySession<T: Float>
{
    time: T,
    bracket: Bracket,
}

impl<T: Float> Session<T> for InMemorySession<T>
{
    fn new(time: T, bracket: Bracket) -> Self {
        Self { time, bracket }
    }

    fn time(&self) -> T {
        self.time
    }

    fn bracket(&self) -> Bracket {
        self.bracket
    }
}
