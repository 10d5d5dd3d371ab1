//! Mathematical morphology for raster masks
//!
//! - **Erosion**: neighborhood minimum (shrinks foreground)
//! - **Dilation**: neighborhood maximum (grows foreground)
//! - **Opening**: erosion then dilation (drops features narrower than the element)
//!
//! Cells outside the grid and masked neighbours are skipped by both
//! reductions instead of poisoning the result. On a fully defined binary
//! mask this makes [`opening`] idempotent, including along the border.

mod dilate;
mod element;
mod erode;
mod opening;

pub use dilate::dilate;
pub use element::StructuringElement;
pub use erode::erode;
pub use opening::opening;

use crate::algebra::cell;
use crate::maybe_rayon::*;
use waterdriver_core::raster::Raster;
use waterdriver_core::Result;

/// Which extreme a neighborhood reduction keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Extreme {
    Min,
    Max,
}

pub(crate) fn reduce_neighborhood(
    raster: &Raster<f64>,
    element: &StructuringElement,
    extreme: Extreme,
) -> Result<Raster<f64>> {
    element.validate()?;

    let (rows, cols) = raster.shape();
    let nodata = raster.nodata();
    let offsets = element.offsets();

    let output: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let center = unsafe { raster.get_unchecked(row, col) };
                let Some(mut acc) = cell(center, nodata) else {
                    continue;
                };

                for &(dr, dc) in &offsets {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let v = unsafe { raster.get_unchecked(nr as usize, nc as usize) };
                    if let Some(v) = cell(v, nodata) {
                        acc = match extreme {
                            Extreme::Min => acc.min(v),
                            Extreme::Max => acc.max(v),
                        };
                    }
                }

                *out = acc;
            }

            row_data
        })
        .collect();

    raster.with_data(output, Some(f64::NAN))
}
