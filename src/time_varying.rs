use std::marker::PhantomData;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::correspondence::TimedCellCorrespondence;
use crate::errors::FieldError;
use crate::float::Float;
use crate::lookup_field::VolumetricGridLookupField;
use crate::session::{Bracket, InMemorySession, Session};

/// Time-keyed collection of spatial lookup fields with session-based
/// space-time queries.
///
/// Slices are inserted in strictly increasing time order during a build
/// phase; every query operation afterwards is read-only. Sessions hand the
/// temporal bracket back to the collection, so they are only meaningful with
/// the collection that produced them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimeVaryingVolumetricGridLookupField<T: Float, S = InMemorySession<T>>
{
    slices: Vec<(T, VolumetricGridLookupField<T>)>,
    session: PhantomData<fn() -> S>,
}

impl<T: Float, S> Default for TimeVaryingVolumetricGridLookupField<T, S>
{
    fn default() -> Self {
        Self { slices: Vec::new(), session: PhantomData }
    }
}

impl<T: Float, S: Session<T>> TimeVaryingVolumetricGridLookupField<T, S>
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a time-tagged spatial field. Keys must be strictly increasing
    /// across insertions; a duplicate, out-of-order, or non-finite time is
    /// rejected with [`FieldError::NonMonotonicTime`].
    pub fn add_volumetric_grid_field(
        &mut self,
        time: T,
        field: VolumetricGridLookupField<T>,
    ) -> Result<(), FieldError>
    {
        if !time.is_finite()
        {
            return Err(FieldError::NonMonotonicTime);
        }
        if let Some((last, _)) = self.slices.last()
        {
            if time <= *last
            {
                return Err(FieldError::NonMonotonicTime);
            }
        }
        self.slices.push((time, field));
        Ok(())
    }

    /// Time keys currently stored, ascending.
    pub fn times(&self) -> impl Iterator<Item = T> + '_ {
        self.slices.iter().map(|(time, _)| *time)
    }

    /// Number of time slices.
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Tightest bracket of consecutive keys containing `time`, collapsing to
    /// a single key on exact match.
    fn bracket_for(&self, time: T) -> Result<Bracket, FieldError>
    {
        let (first, last) = match (self.slices.first(), self.slices.last())
        {
            (Some((first, _)), Some((last, _))) => (*first, *last),
            _ => return Err(FieldError::EmptyField),
        };
        // NaN fails both comparisons and is rejected here as well.
        if !(time >= first && time <= last)
        {
            return Err(FieldError::TimeOutOfRange);
        }
        let i = self.slices.partition_point(|(key, _)| *key < time);
        if i < self.slices.len() && self.slices[i].0 == time
        {
            Ok(Bracket::Single(i))
        }
        else
        {
            Ok(Bracket::Pair(i - 1, i))
        }
    }

    /// Opens a session at the earliest key. Fails on an empty collection.
    pub fn create_session(&self) -> Result<S, FieldError>
    {
        let time = self.slices.first().map(|(time, _)| *time).ok_or(FieldError::EmptyField)?;
        Ok(S::new(time, Bracket::Single(0)))
    }

    /// Opens a session at an arbitrary time within the sampled range.
    pub fn create_session_at(&self, time: T) -> Result<S, FieldError>
    {
        Ok(S::new(time, self.bracket_for(time)?))
    }

    /// Re-brackets a session for a new time, leaving the input session
    /// untouched. Stepping backward is permitted; only times outside the
    /// sampled range fail.
    pub fn step_to(&self, session: &S, time: T) -> Result<S, FieldError>
    {
        // Fast path: the new time stays strictly inside the current pair.
        if let Bracket::Pair(lower, upper) = session.bracket()
        {
            if let (Some((t_lower, _)), Some((t_upper, _))) =
                (self.slices.get(lower), self.slices.get(upper))
            {
                if time > *t_lower && time < *t_upper
                {
                    return Ok(S::new(time, session.bracket()));
                }
            }
        }
        Ok(S::new(time, self.bracket_for(time)?))
    }

    /// Resolves the query point against each bracketed slice, tagging every
    /// correspondence with its slice time, ascending.
    pub fn lookup(&self, session: &S, point: &Vector3<T>) -> Vec<TimedCellCorrespondence<T>>
    {
        let mut out = Vec::with_capacity(2);
        for position in session.bracket().positions()
        {
            if let Some((time, field)) = self.slices.get(position)
            {
                out.push(TimedCellCorrespondence {
                    time: *time,
                    correspondence: field.lookup(point),
                });
            }
        }
        out
    }

    /// Interpolated value at `(point, session.time())` for the point the
    /// correspondences were resolved at.
    ///
    /// `values` holds one value array per bracketed slice, aligned with
    /// `correspondences` and matching the slice's cloud cardinality. Each
    /// slice contributes its trilinear estimate (or `default` for an empty
    /// correspondence); a two-slice bracket blends the estimates linearly in
    /// time.
    pub fn estimate_quadrilinear<V: Float>(
        &self,
        session: &S,
        correspondences: &[TimedCellCorrespondence<T>],
        values: &[&[V]],
        default: V,
    ) -> Result<V, FieldError>
    {
        let bracket = session.bracket();
        if correspondences.len() != bracket.positions().len()
            || values.len() != correspondences.len()
        {
            return Err(FieldError::CorrespondenceCountMismatch);
        }
        for (position, slice_values) in bracket.positions().zip(values)
        {
            let (_, field) = self
                .slices
                .get(position)
                .ok_or(FieldError::CorrespondenceCountMismatch)?;
            if slice_values.len() != field.len()
            {
                return Err(FieldError::ValueCountMismatch);
            }
        }
        match (correspondences, values)
        {
            ([single], [slice_values]) => Ok(single.correspondence.interpolate(slice_values, default)),
            ([lower, upper], [lower_values, upper_values]) =>
            {
                let at_lower = lower.correspondence.interpolate(lower_values, default);
                let at_upper = upper.correspondence.interpolate(upper_values, default);
                let fraction = (session.time() - lower.time) / (upper.time - lower.time);
                let fraction = V::from_f64(Float::to_f64(&fraction));
                Ok(at_lower + (at_upper - at_lower) * fraction)
            }
            _ => Err(FieldError::CorrespondenceCountMismatch),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn unit_cube() -> Vec<Vector3<f64>>
    {
        (0..8)
            .map(|i| Vector3::new((i >> 2 & 1) as f64, (i >> 1 & 1) as f64, (i & 1) as f64))
            .collect()
    }

    fn two_slice_field() -> TimeVaryingVolumetricGridLookupField<f64>
    {
        let index = VolumetricGridLookupField::new(&unit_cube()).unwrap();
        let mut field = TimeVaryingVolumetricGridLookupField::new();
        field.add_volumetric_grid_field(0.0, index.clone()).unwrap();
        field.add_volumetric_grid_field(1.0, index).unwrap();
        field
    }

    #[test]
    fn end_to_end_unit_cube_scenario()
    {
        let field = two_slice_field();
        let point = Vector3::new(0.5, 0.5, 0.5);
        let values_t0 = vec![0.0; 8];
        let values_t1 = vec![1.0; 8];

        let session = field.create_session().unwrap();
        assert_eq!(session.time(), 0.0);
        let points = field.lookup(&session, &point);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].time, 0.0);
        let result = field
            .estimate_quadrilinear(&session, &points, &[&values_t0], -1.0)
            .unwrap();
        assert_eq!(result, 0.0);

        let session = field.step_to(&session, 0.5).unwrap();
        assert_eq!(session.time(), 0.5);
        let points = field.lookup(&session, &point);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].time, 0.0);
        assert_eq!(points[1].time, 1.0);
        let result = field
            .estimate_quadrilinear(&session, &points, &[&values_t0, &values_t1], -1.0)
            .unwrap();
        assert_eq!(result, 0.5);

        let session = field.step_to(&session, 1.0).unwrap();
        let points = field.lookup(&session, &point);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].time, 1.0);
        let result = field
            .estimate_quadrilinear(&session, &points, &[&values_t1], -1.0)
            .unwrap();
        assert_eq!(result, 1.0);

        assert_eq!(field.step_to(&session, 2.0).unwrap_err(), FieldError::TimeOutOfRange);
    }

    #[test]
    fn session_creation_respects_temporal_bounds()
    {
        let field = two_slice_field();
        assert!(field.create_session_at(0.0).is_ok());
        assert!(field.create_session_at(0.7).is_ok());
        assert!(field.create_session_at(1.0).is_ok());
        assert_eq!(field.create_session_at(-0.1).unwrap_err(), FieldError::TimeOutOfRange);
        assert_eq!(field.create_session_at(1.1).unwrap_err(), FieldError::TimeOutOfRange);
        assert_eq!(field.create_session_at(f64::NAN).unwrap_err(), FieldError::TimeOutOfRange);

        let empty = TimeVaryingVolumetricGridLookupField::<f64>::new();
        assert_eq!(empty.create_session().unwrap_err(), FieldError::EmptyField);
        assert_eq!(empty.create_session_at(0.0).unwrap_err(), FieldError::EmptyField);
    }

    #[test]
    fn insertion_requires_strictly_increasing_times()
    {
        let index = VolumetricGridLookupField::new(&unit_cube()).unwrap();
        let mut field = TimeVaryingVolumetricGridLookupField::<f64>::new();
        field.add_volumetric_grid_field(0.0, index.clone()).unwrap();
        assert_eq!(
            field.add_volumetric_grid_field(0.0, index.clone()).unwrap_err(),
            FieldError::NonMonotonicTime
        );
        assert_eq!(
            field.add_volumetric_grid_field(-1.0, index.clone()).unwrap_err(),
            FieldError::NonMonotonicTime
        );
        assert_eq!(
            field.add_volumetric_grid_field(f64::NAN, index.clone()).unwrap_err(),
            FieldError::NonMonotonicTime
        );
        field.add_volumetric_grid_field(2.0, index).unwrap();
        assert_eq!(field.times().collect::<Vec<_>>(), vec![0.0, 2.0]);
        assert_eq!(field.len(), 2);
    }

    #[test]
    fn stepping_is_immutable_and_bidirectional()
    {
        let field = two_slice_field();
        let first = field.create_session_at(1.0).unwrap();
        let second = field.step_to(&first, 0.25).unwrap();
        assert_eq!(second.time(), 0.25);
        assert_eq!(second.bracket(), Bracket::Pair(0, 1));
        // The original session still answers queries at its own time.
        assert_eq!(first.time(), 1.0);
        assert_eq!(field.lookup(&first, &Vector3::new(0.5, 0.5, 0.5)).len(), 1);

        // Fast path: moving within the same pair keeps the bracket.
        let third = field.step_to(&second, 0.75).unwrap();
        assert_eq!(third.bracket(), Bracket::Pair(0, 1));
        assert_eq!(third.time(), 0.75);
    }

    #[test]
    fn estimate_is_continuous_toward_bracket_boundaries()
    {
        let field = two_slice_field();
        let point = Vector3::new(0.5, 0.5, 0.5);
        let values_t0: Vec<f64> = vec![0.0; 8];
        let values_t1: Vec<f64> = vec![1.0; 8];
        let mut session = field.create_session().unwrap();
        for time in [0.9, 0.99, 0.999]
        {
            session = field.step_to(&session, time).unwrap();
            let points = field.lookup(&session, &point);
            let result = field
                .estimate_quadrilinear(&session, &points, &[&values_t0, &values_t1], -1.0)
                .unwrap();
            assert!((result - 1.0).abs() <= (1.0 - time) + 1e-12);
        }
    }

    #[test]
    fn spatially_out_of_bounds_queries_yield_default()
    {
        let field = two_slice_field();
        let session = field.create_session_at(0.5).unwrap();
        let points = field.lookup(&session, &Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.correspondence.is_empty()));
        let values = vec![0.0; 8];
        let result = field
            .estimate_quadrilinear(&session, &points, &[&values, &values], -1.0)
            .unwrap();
        assert_eq!(result, -1.0);
    }

    #[test]
    fn estimate_validates_argument_shapes()
    {
        let field = two_slice_field();
        let point = Vector3::new(0.5, 0.5, 0.5);
        let session = field.create_session_at(0.5).unwrap();
        let points = field.lookup(&session, &point);
        let values = vec![0.0; 8];
        let short = vec![0.0; 7];
        assert_eq!(
            field.estimate_quadrilinear(&session, &points, &[&values], -1.0).unwrap_err(),
            FieldError::CorrespondenceCountMismatch
        );
        assert_eq!(
            field
                .estimate_quadrilinear(&session, &points, &[&values, &short], -1.0)
                .unwrap_err(),
            FieldError::ValueCountMismatch
        );
    }

    #[test]
    fn slices_may_have_different_cloud_cardinalities()
    {
        let coarse = VolumetricGridLookupField::new(&unit_cube()).unwrap();
        let mut fine_cloud = Vec::new();
        for x in 0..3
        {
            for y in 0..3
            {
                for z in 0..3
                {
                    fine_cloud.push(Vector3::new(x as f64 / 2.0, y as f64 / 2.0, z as f64 / 2.0));
                }
            }
        }
        let fine = VolumetricGridLookupField::new(&fine_cloud).unwrap();
        let mut field = TimeVaryingVolumetricGridLookupField::<f64>::new();
        field.add_volumetric_grid_field(0.0, coarse).unwrap();
        field.add_volumetric_grid_field(1.0, fine).unwrap();

        let session = field.create_session_at(0.5).unwrap();
        let points = field.lookup(&session, &Vector3::new(0.25, 0.25, 0.25));
        let values_coarse = vec![0.0; 8];
        let values_fine = vec![1.0; 27];
        let result = field
            .estimate_quadrilinear(&session, &points, &[&values_coarse, &values_fine], -1.0)
            .unwrap();
        assert_eq!(result, 0.5);
    }

    #[test]
    fn exact_key_estimate_has_no_temporal_blending()
    {
        let field = two_slice_field();
        let point = Vector3::new(0.25, 0.5, 0.75);
        let values_t0: Vec<f64> = unit_cube().iter().map(|p| p[0] + p[1] + p[2]).collect();
        let session = field.create_session_at(0.0).unwrap();
        let points = field.lookup(&session, &point);
        assert_eq!(points.len(), 1);
        let spatial = points[0].correspondence.interpolate(&values_t0, -1.0);
        let result = field
            .estimate_quadrilinear(&session, &points, &[&values_t0], -1.0)
            .unwrap();
        assert_eq!(result, spatial);
        assert!((result - 1.5).abs() < 1e-12);
    }

    #[test]
    fn sessions_are_plain_copyable_values()
    {
        let field = two_slice_field();
        let session: InMemorySession<f64> = field.create_session_at(0.5).unwrap();
        let copy = session;
        assert_eq!(copy, session);
        assert_eq!(copy.bracket(), Bracket::Pair(0, 1));
    }
}
