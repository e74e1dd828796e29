use nalgebra::Vector3;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::axis::AxisIndex;
use crate::correspondence::{CellCorrespondence, GridVertex};
use crate::errors::FieldError;
use crate::float::Float;

/// Spatial lookup index over one static point cloud, interpreted as the
/// vertex set of a (possibly non-uniformly spaced) rectilinear lattice.
/// Built once, then queried read-only; each query costs one binary search per
/// axis plus assembly of at most 8 cell corners.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VolumetricGridLookupField<T: Float>
{
    axes: [AxisIndex<T>; 3],
    /// Lattice coordinates -> index of the cloud point sitting there.
    vertices: FxHashMap<[usize; 3], usize>,
    num_points: usize,
}

impl<T: Float> VolumetricGridLookupField<T>
{
    /// Builds the index from a point cloud. Points sharing a position keep
    /// the last one's index. Fails with [`FieldError::EmptyCloud`] on an
    /// empty cloud and [`FieldError::MalformedCloud`] on non-finite
    /// coordinates.
    pub fn new(cloud: &[Vector3<T>]) -> Result<Self, FieldError>
    {
        if cloud.is_empty()
        {
            return Err(FieldError::EmptyCloud);
        }
        let mut axes: [AxisIndex<T>; 3] = std::array::from_fn(|_| AxisIndex::default());
        for point in cloud
        {
            for (axis, index) in axes.iter_mut().enumerate()
            {
                if !point[axis].is_finite()
                {
                    return Err(FieldError::MalformedCloud);
                }
                index.register(point[axis]);
            }
        }
        for index in axes.iter_mut()
        {
            index.finish();
        }
        let mut vertices = FxHashMap::default();
        vertices.reserve(cloud.len());
        for (index, point) in cloud.iter().enumerate()
        {
            let mut key = [0; 3];
            for axis in 0..3
            {
                key[axis] = axes[axis]
                    .position_of(point[axis])
                    .ok_or(FieldError::MalformedCloud)?;
            }
            vertices.insert(key, index);
        }
        Ok(Self { axes, vertices, num_points: cloud.len() })
    }

    /// Maps a query point to the lattice cell enclosing it. The result is
    /// empty when the point lies outside the lattice bounds on any axis; an
    /// axis the point hits exactly collapses to a single corner.
    pub fn lookup(&self, point: &Vector3<T>) -> CellCorrespondence<T>
    {
        let (Some(bx), Some(by), Some(bz)) = (
            self.axes[0].bracket(point[0]),
            self.axes[1].bracket(point[1]),
            self.axes[2].bracket(point[2]),
        )
        else
        {
            return CellCorrespondence::empty();
        };
        let mut corners = Vec::with_capacity(bx.span() * by.span() * bz.span());
        for xi in bx.positions()
        {
            for yi in by.positions()
            {
                for zi in bz.positions()
                {
                    let corner = self.vertices.get(&[xi, yi, zi]).map(|&index| GridVertex {
                        index,
                        position: Vector3::new(
                            self.axes[0].value(xi),
                            self.axes[1].value(yi),
                            self.axes[2].value(zi),
                        ),
                    });
                    corners.push(corner);
                }
            }
        }
        CellCorrespondence::new(
            corners,
            [bx.fraction(), by.fraction(), bz.fraction()],
            [bx.span(), by.span(), bz.span()],
        )
    }

    /// Resolves many query points in parallel.
    pub fn lookup_batch(&self, points: &[Vector3<T>]) -> Vec<CellCorrespondence<T>>
    where
        T: Send + Sync,
    {
        points.par_iter().map(|point| self.lookup(point)).collect()
    }

    /// Cardinality of the source cloud.
    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Lattice bounds as (min corner, max corner).
    pub fn bounds(&self) -> Option<(Vector3<T>, Vector3<T>)>
    {
        Some((
            Vector3::new(self.axes[0].min()?, self.axes[1].min()?, self.axes[2].min()?),
            Vector3::new(self.axes[0].max()?, self.axes[1].max()?, self.axes[2].max()?),
        ))
    }
}

#[cfg(test)]
fn unit_cube() -> Vec<Vector3<f64>>
{
    (0..8)
        .map(|i| Vector3::new((i >> 2 & 1) as f64, (i >> 1 & 1) as f64, (i & 1) as f64))
        .collect()
}

#[test]
fn cube_center_has_eight_corners()
{
    let field = VolumetricGridLookupField::new(&unit_cube()).unwrap();
    let cell = field.lookup(&Vector3::new(0.5, 0.5, 0.5));
    assert_eq!(cell.vertices().count(), 8);
    assert_eq!(cell.spans(), [2, 2, 2]);
    for fraction in cell.fractions()
    {
        assert!((fraction - 0.5).abs() < 1e-12);
    }
    assert!((cell.interpolate::<f64>(&[1.0; 8], -1.0) - 1.0).abs() < 1e-12);
}

#[test]
fn lattice_planes_collapse_axes()
{
    let field = VolumetricGridLookupField::new(&unit_cube()).unwrap();
    assert_eq!(field.lookup(&Vector3::new(0.5, 0.5, 0.0)).vertices().count(), 4);
    assert_eq!(field.lookup(&Vector3::new(0.5, 1.0, 0.0)).vertices().count(), 2);
    assert_eq!(field.lookup(&Vector3::new(1.0, 1.0, 1.0)).vertices().count(), 1);
}

#[test]
fn exact_vertex_lookup_returns_its_value()
{
    let field = VolumetricGridLookupField::new(&unit_cube()).unwrap();
    let cell = field.lookup(&Vector3::new(1.0, 0.0, 1.0));
    let values = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0];
    // (1, 0, 1) is cloud point 5 in the unit_cube ordering.
    assert_eq!(cell.interpolate(&values, -1.0), 15.0);
}

#[test]
fn out_of_bounds_lookup_is_empty()
{
    let field = VolumetricGridLookupField::new(&unit_cube()).unwrap();
    assert!(field.lookup(&Vector3::new(1.5, 0.5, 0.5)).is_empty());
    assert!(field.lookup(&Vector3::new(0.5, -0.1, 0.5)).is_empty());
    assert!(field.lookup(&Vector3::new(0.5, 0.5, f64::NAN)).is_empty());
}

#[test]
fn non_uniform_spacing_fractions()
{
    let cloud: Vec<Vector3<f64>> = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(4.0, 0.0, 0.0),
    ];
    let field = VolumetricGridLookupField::new(&cloud).unwrap();
    let cell = field.lookup(&Vector3::new(2.0, 0.0, 0.0));
    assert_eq!(cell.spans(), [2, 1, 1]);
    assert!((cell.fractions()[0] - 1.0 / 3.0).abs() < 1e-12);
    let values: [f64; 3] = [0.0, 10.0, 40.0];
    assert!((cell.interpolate(&values, -1.0) - 20.0).abs() < 1e-12);
}

#[test]
fn incomplete_lattice_corner_falls_back_to_default()
{
    // 2x2x1 lattice with the (1, 1, 0) vertex missing from the cloud.
    let cloud = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    ];
    let field = VolumetricGridLookupField::new(&cloud).unwrap();
    let cell = field.lookup(&Vector3::new(0.5, 0.5, 0.0));
    assert_eq!(cell.vertices().count(), 3);
    assert!((cell.interpolate::<f64>(&[1.0; 3], 0.0) - 0.75).abs() < 1e-12);
}

#[test]
fn trilinear_reproduces_linear_field()
{
    let field = VolumetricGridLookupField::new(&unit_cube()).unwrap();
    let values: Vec<f64> = unit_cube()
        .iter()
        .map(|p| p[0] + 2.0 * p[1] + 3.0 * p[2])
        .collect();
    let cell = field.lookup(&Vector3::new(0.25, 0.5, 0.75));
    let expected = 0.25 + 2.0 * 0.5 + 3.0 * 0.75;
    assert!((cell.interpolate(&values, -1.0) - expected).abs() < 1e-12);
}

#[test]
fn batch_lookup_matches_sequential()
{
    let field = VolumetricGridLookupField::new(&unit_cube()).unwrap();
    let points: Vec<Vector3<f64>> = (0..100)
        .map(|i| {
            let t = i as f64 / 99.0;
            Vector3::new(t, 1.0 - t, 0.5)
        })
        .collect();
    let batch = field.lookup_batch(&points);
    let values = [1.0; 8];
    for (point, cell) in points.iter().zip(&batch)
    {
        let sequential = field.lookup(point);
        assert_eq!(cell.spans(), sequential.spans());
        assert_eq!(cell.interpolate(&values, -1.0), sequential.interpolate(&values, -1.0));
    }
}

#[test]
fn degenerate_clouds_are_rejected()
{
    assert_eq!(
        VolumetricGridLookupField::<f64>::new(&[]).unwrap_err(),
        FieldError::EmptyCloud
    );
    let cloud = vec![Vector3::new(0.0, f64::NAN, 0.0)];
    assert_eq!(
        VolumetricGridLookupField::new(&cloud).unwrap_err(),
        FieldError::MalformedCloud
    );
}

#[test]
fn bounds_report_lattice_extent()
{
    let field = VolumetricGridLookupField::new(&unit_cube()).unwrap();
    let (min, max) = field.bounds().unwrap();
    assert_eq!(min, Vector3::new(0.0, 0.0, 0.0));
    assert_eq!(max, Vector3::new(1.0, 1.0, 1.0));
}
