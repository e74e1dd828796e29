use serde::{Deserialize, Serialize};

use crate::float::Float;

/// Sorted, deduplicated coordinate values of one lattice axis, built from the
/// corresponding component of every cloud point.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct AxisIndex<T>
{
    values: Vec<T>,
}

impl<T> Default for AxisIndex<T>
{
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

/// Result of bracketing a coordinate along one axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum AxisBracket<T>
{
    /// The coordinate coincides with a lattice value; the axis collapses.
    Exact(usize),
    /// The coordinate lies strictly between two adjacent lattice values.
    Between { lower: usize, upper: usize, fraction: T },
}

impl<T: Float> AxisBracket<T>
{
    /// Number of distinct lattice values spanned (1 collapsed, 2 bracketing).
    pub fn span(&self) -> usize {
        match self {
            AxisBracket::Exact(_) => 1,
            AxisBracket::Between { .. } => 2,
        }
    }

    /// Fractional position between the bracketing values; 0 when collapsed.
    pub fn fraction(&self) -> T {
        match self {
            AxisBracket::Exact(_) => T::zero(),
            AxisBracket::Between { fraction, .. } => *fraction,
        }
    }

    /// Lattice positions covered, ascending.
    pub fn positions(&self) -> std::iter::Take<std::array::IntoIter<usize, 2>> {
        match *self {
            AxisBracket::Exact(index) => [index, index].into_iter().take(1),
            AxisBracket::Between { lower, upper, .. } => [lower, upper].into_iter().take(2),
        }
    }
}

impl<T: Float> AxisIndex<T>
{
    pub fn register(&mut self, value: T) {
        self.values.push(value);
    }

    /// Sorts and deduplicates registered values. Must run once after
    /// registration, before any query.
    pub fn finish(&mut self) {
        self.values
            .sort_unstable_by(|a, b| Float::to_f64(a).total_cmp(&Float::to_f64(b)));
        self.values.dedup();
    }

    pub fn value(&self, position: usize) -> T {
        self.values[position]
    }

    pub fn min(&self) -> Option<T> {
        self.values.first().copied()
    }

    pub fn max(&self) -> Option<T> {
        self.values.last().copied()
    }

    /// Position of an exactly matching lattice value.
    pub fn position_of(&self, value: T) -> Option<usize> {
        let i = self.values.partition_point(|v| *v < value);
        (i < self.values.len() && self.values[i] == value).then_some(i)
    }

    /// Bracketing pair (or exact match) for a coordinate. `None` outside the
    /// axis bounds; NaN never brackets.
    pub fn bracket(&self, value: T) -> Option<AxisBracket<T>> {
        let i = self.values.partition_point(|v| *v < value);
        if i < self.values.len() && self.values[i] == value
        {
            return Some(AxisBracket::Exact(i));
        }
        if i == 0 || i == self.values.len()
        {
            return None;
        }
        let lower = self.values[i - 1];
        let upper = self.values[i];
        Some(AxisBracket::Between {
            lower: i - 1,
            upper: i,
            fraction: (value - lower) / (upper - lower),
        })
    }
}

#[test]
fn bracket_interior_point()
{
    let mut axis = AxisIndex::<f64>::default();
    for v in [3.0, 0.0, 1.0, 0.0, 3.0]
    {
        axis.register(v);
    }
    axis.finish();
    let bracket = axis.bracket(2.0).unwrap();
    assert_eq!(bracket.span(), 2);
    assert_eq!(bracket.positions().collect::<Vec<_>>(), vec![1, 2]);
    assert!((bracket.fraction() - 0.5).abs() < 1e-12);
}

#[test]
fn bracket_collapses_on_exact_match()
{
    let mut axis = AxisIndex::default();
    for v in [0.0, 1.0, 3.0]
    {
        axis.register(v);
    }
    axis.finish();
    for (value, position) in [(0.0, 0usize), (1.0, 1), (3.0, 2)]
    {
        let bracket = axis.bracket(value).unwrap();
        assert_eq!(bracket, AxisBracket::Exact(position));
        assert_eq!(bracket.span(), 1);
        assert_eq!(bracket.fraction(), 0.0);
    }
}

#[test]
fn bracket_rejects_out_of_bounds()
{
    let mut axis = AxisIndex::default();
    for v in [0.0, 1.0]
    {
        axis.register(v);
    }
    axis.finish();
    assert_eq!(axis.bracket(-0.1), None);
    assert_eq!(axis.bracket(1.1), None);
    assert_eq!(axis.bracket(f64::NAN), None);
}

#[test]
fn single_value_axis()
{
    let mut axis = AxisIndex::default();
    axis.register(2.0);
    axis.finish();
    assert_eq!(axis.bracket(2.0), Some(AxisBracket::Exact(0)));
    assert_eq!(axis.bracket(2.5), None);
    assert_eq!(axis.position_of(2.0), Some(0));
    assert_eq!(axis.position_of(1.0), None);
}
