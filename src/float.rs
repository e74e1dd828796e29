use nalgebra::Scalar;

/// Floating point scalar usable for grid coordinates, field values, and time
/// keys. `num_traits::Float` supplies arithmetic and comparison; the f64
/// round-trip is used to blend value scalars by coordinate-typed fractions.
pub trait Float: num_traits::Float + Scalar {
    fn to_f64(&self) -> f64;
    fn from_f64(value: f64) -> Self;
}

impl Float for f64 {
    fn to_f64(&self) -> f64 {
        *self
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

impl Float for f32 {
    fn to_f64(&self) -> f64 {
        *self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}
