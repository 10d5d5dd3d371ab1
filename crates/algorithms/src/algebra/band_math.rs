//! Band math operations
//!
//! Apply mathematical functions to one or two rasters element-wise.

use waterdriver_core::raster::Raster;
use waterdriver_core::Result;

use super::{map_cells, zip_cells};

/// Binary operations for band math
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandMathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Min,
    Max,
}

impl BandMathOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BandMathOp::Add => a + b,
            BandMathOp::Subtract => a - b,
            BandMathOp::Multiply => a * b,
            BandMathOp::Divide => {
                if b.abs() < f64::EPSILON {
                    f64::NAN
                } else {
                    a / b
                }
            }
            BandMathOp::Min => a.min(b),
            BandMathOp::Max => a.max(b),
        }
    }
}

/// Apply a unary function to every cell in a raster.
///
/// Masked cells stay masked.
///
/// # Example
/// ```ignore
/// let influence = band_math(&distance, |d| (decay * d).exp() * scale)?;
/// ```
pub fn band_math<F>(raster: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    map_cells(raster, |v| v.map_or(f64::NAN, &f))
}

/// Apply a binary operation between two rasters element-wise.
///
/// Both rasters must share a grid. A masked cell in either input produces a
/// masked output cell; `unmask` the inputs first to treat them as a value.
pub fn band_math_binary(a: &Raster<f64>, b: &Raster<f64>, op: BandMathOp) -> Result<Raster<f64>> {
    zip_cells(a, b, |va, vb| match (va, vb) {
        (Some(x), Some(y)) => op.apply(x, y),
        _ => f64::NAN,
    })
}

/// Linear interpolation `a + fraction * (b - a)`, cell-wise.
///
/// The expression is evaluated in exactly this form so that results for
/// constant inputs are bit-identical to the scalar formula.
pub fn lerp(a: &Raster<f64>, b: &Raster<f64>, fraction: f64) -> Result<Raster<f64>> {
    zip_cells(a, b, |va, vb| match (va, vb) {
        (Some(x), Some(y)) => x + fraction * (y - x),
        _ => f64::NAN,
    })
}
