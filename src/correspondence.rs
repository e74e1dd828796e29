use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::float::Float;

/// One corner of the lattice cell enclosing a query point.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridVertex<T: Float>
{
    /// Index of this vertex in the cloud the field was built from.
    pub index: usize,
    /// Coordinate of this vertex.
    pub position: Vector3<T>,
}

/// The lattice cell enclosing a query point: up to 8 corner slots in
/// canonical product order (x outer, y middle, z inner) plus per-axis
/// interpolation fractions in `[0, 1]`.
///
/// An axis on which the point coincides with a lattice value collapses to a
/// single corner (fraction 0, full weight along that axis). A corner whose
/// lattice vertex is absent from the source cloud is recorded as missing and
/// contributes the caller-supplied default during interpolation. The
/// correspondence is empty when the point lies outside the lattice bounds on
/// any axis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CellCorrespondence<T: Float>
{
    corners: Vec<Option<GridVertex<T>>>,
    fractions: [T; 3],
    spans: [usize; 3],
}

impl<T: Float> CellCorrespondence<T>
{
    pub(crate) fn empty() -> Self {
        Self { corners: Vec::new(), fractions: [T::zero(); 3], spans: [0; 3] }
    }

    pub(crate) fn new(corners: Vec<Option<GridVertex<T>>>, fractions: [T; 3], spans: [usize; 3]) -> Self {
        Self { corners, fractions, spans }
    }

    /// True when the query point fell outside the lattice bounds.
    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    /// Corner vertices present in the source cloud, in product order.
    pub fn vertices(&self) -> impl Iterator<Item = &GridVertex<T>> {
        self.corners.iter().flatten()
    }

    /// Per-axis interpolation fractions; 0 on collapsed axes.
    pub fn fractions(&self) -> [T; 3] {
        self.fractions
    }

    /// Distinct lattice values spanned per axis (1 collapsed, 2 bracketing;
    /// all zero when empty).
    pub fn spans(&self) -> [usize; 3] {
        self.spans
    }

    /// Trilinear combination of `values` at the cell corners, weighted by the
    /// stored per-axis fractions. Collapsed axes contribute full weight. An
    /// empty correspondence yields `default`; so does every corner missing
    /// from the cloud or out of range of `values`.
    pub fn interpolate<V: Float>(&self, values: &[V], default: V) -> V
    {
        if self.is_empty()
        {
            return default;
        }
        let mut acc = [default; 8];
        for (slot, corner) in self.corners.iter().enumerate()
        {
            if let Some(vertex) = corner
            {
                if let Some(&value) = values.get(vertex.index)
                {
                    acc[slot] = value;
                }
            }
        }
        // Pairwise lerp along each non-collapsed axis, innermost (z) first;
        // the product ordering keeps each pair adjacent.
        let mut count = self.corners.len();
        for axis in (0..3).rev()
        {
            if self.spans[axis] < 2
            {
                continue;
            }
            let fraction = V::from_f64(Float::to_f64(&self.fractions[axis]));
            count /= 2;
            for i in 0..count
            {
                let lower = acc[2 * i];
                let upper = acc[2 * i + 1];
                acc[i] = lower + (upper - lower) * fraction;
            }
        }
        acc[0]
    }
}

/// A cell correspondence tagged with the time slice it was resolved against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimedCellCorrespondence<T: Float>
{
    pub time: T,
    pub correspondence: CellCorrespondence<T>,
}

#[cfg(test)]
fn full_cell(fractions: [f64; 3]) -> CellCorrespondence<f64>
{
    let mut corners = Vec::with_capacity(8);
    for xi in 0..2
    {
        for yi in 0..2
        {
            for zi in 0..2
            {
                corners.push(Some(GridVertex {
                    index: xi * 4 + yi * 2 + zi,
                    position: Vector3::new(xi as f64, yi as f64, zi as f64),
                }));
            }
        }
    }
    CellCorrespondence::new(corners, fractions, [2, 2, 2])
}

#[test]
fn all_ones_reconstructs_one()
{
    let cell = full_cell([0.3, 0.7, 0.5]);
    let values: [f64; 8] = [1.0; 8];
    assert!((cell.interpolate(&values, -1.0) - 1.0).abs() < 1e-12);
}

#[test]
fn linear_field_is_reproduced_exactly()
{
    let cell = full_cell([0.25, 0.5, 0.75]);
    // value = x + 2y + 3z at each corner
    let mut values = [0.0; 8];
    for (i, value) in values.iter_mut().enumerate()
    {
        let (x, y, z) = ((i >> 2 & 1) as f64, (i >> 1 & 1) as f64, (i & 1) as f64);
        *value = x + 2.0 * y + 3.0 * z;
    }
    let expected = 0.25 + 2.0 * 0.5 + 3.0 * 0.75;
    assert!((cell.interpolate(&values, -1.0) - expected).abs() < 1e-12);
}

#[test]
fn collapsed_axes_skip_blending()
{
    // Point on a lattice plane in z: 4 corners, z span collapsed.
    let corners = (0..4)
        .map(|i| {
            Some(GridVertex {
                index: i,
                position: Vector3::new((i >> 1 & 1) as f64, (i & 1) as f64, 0.0),
            })
        })
        .collect();
    let cell = CellCorrespondence::new(corners, [0.5, 0.5, 0.0], [2, 2, 1]);
    let values: [f64; 4] = [0.0, 2.0, 4.0, 6.0];
    assert!((cell.interpolate(&values, -1.0) - 3.0).abs() < 1e-12);
}

#[test]
fn missing_corner_contributes_default()
{
    let mut cell = full_cell([0.5, 0.5, 0.5]);
    cell.corners[7] = None;
    let values: [f64; 8] = [1.0; 8];
    let expected = 7.0 / 8.0;
    assert!((cell.interpolate(&values, 0.0) - expected).abs() < 1e-12);
}

#[test]
fn empty_correspondence_yields_default()
{
    let cell = CellCorrespondence::<f64>::empty();
    assert!(cell.is_empty());
    assert_eq!(cell.interpolate(&[1.0, 2.0], -1.0), -1.0);
}
