//! Time-varying volumetric grid lookup fields.
//!
//! A [`VolumetricGridLookupField`] indexes a static point cloud as a
//! rectilinear lattice and maps query points to their enclosing cells. A
//! [`TimeVaryingVolumetricGridLookupField`] keys several such fields by time
//! and answers space-time queries through immutable [`Session`] values:
//! per-slice trilinear interpolation blended linearly across the temporal
//! bracket (quadrilinear). Value arrays stay with the caller; the field only
//! stores the index structure.
//!
//! ```
//! use nalgebra::Vector3;
//! use volgrid::{TimeVaryingVolumetricGridLookupField, VolumetricGridLookupField};
//!
//! let cloud: Vec<Vector3<f64>> = (0..8)
//!     .map(|i| Vector3::new((i >> 2 & 1) as f64, (i >> 1 & 1) as f64, (i & 1) as f64))
//!     .collect();
//! let index = VolumetricGridLookupField::new(&cloud).unwrap();
//!
//! let mut field = TimeVaryingVolumetricGridLookupField::<f64>::new();
//! field.add_volumetric_grid_field(0.0, index.clone()).unwrap();
//! field.add_volumetric_grid_field(1.0, index).unwrap();
//!
//! let session = field.create_session().unwrap();
//! let session = field.step_to(&session, 0.5).unwrap();
//! let point = Vector3::new(0.5, 0.5, 0.5);
//! let correspondences = field.lookup(&session, &point);
//! let values_t0: Vec<f64> = vec![0.0; 8];
//! let values_t1: Vec<f64> = vec![1.0; 8];
//! let value = field
//!     .estimate_quadrilinear(&session, &correspondences, &[&values_t0, &values_t1], -1.0)
//!     .unwrap();
//! assert!((value - 0.5).abs() < 1e-12);
//! ```

mod axis;
pub mod correspondence;
pub mod errors;
pub mod float;
pub mod lookup_field;
pub mod session;
pub mod time_varying;

pub use correspondence::{CellCorrespondence, GridVertex, TimedCellCorrespondence};
pub use errors::FieldError;
pub use float::Float;
pub use lookup_field::VolumetricGridLookupField;
pub use session::{Bracket, InMemorySession, Session};
pub use time_varying::TimeVaryingVolumetricGridLookupField;
