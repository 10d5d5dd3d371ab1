//! Compositing the coastal and inland fields into the exported driver

use tracing::info;
use waterdriver_algorithms::algebra::{
    band_math_binary, logical_not, logical_or, quantize, threshold, unmask, update_mask,
    BandMathOp, Comparison,
};
use waterdriver_algorithms::resample::Resampling;
use waterdriver_core::raster::Raster;

use crate::engine::RasterEngine;
use crate::error::Result;

/// Multiplier applied before truncating the driver to integers
pub const QUANTIZATION_FACTOR: f64 = 100.0;

/// Working-scale water mask: ocean, or a cell at least half covered by
/// fine-scale water.
pub fn water_presence_mask<E: RasterEngine + ?Sized>(
    engine: &E,
    ocean_mask: &Raster<f64>,
    fine_presence: &Raster<f64>,
) -> Result<Raster<f64>> {
    let fraction = engine.resample_to(fine_presence, ocean_mask, Resampling::Mean)?;
    let inland = threshold(&unmask(&fraction, 0.0)?, Comparison::Gte, 0.5)?;
    Ok(logical_or(ocean_mask, &inland)?)
}

/// Combine both influence fields into the quantized driver.
///
/// Cell-wise maximum with masked cells counting as 0, masked on water and
/// outside `valid_domain` (domain cells masked or 0), then multiplied by
/// [`QUANTIZATION_FACTOR`] and truncated. Masked output cells hold
/// `i32::MIN`.
pub fn composite(
    coastal: &Raster<f64>,
    inland: &Raster<f64>,
    water_presence: &Raster<f64>,
    valid_domain: Option<&Raster<f64>>,
) -> Result<Raster<i32>> {
    let combined = band_math_binary(
        &unmask(coastal, 0.0)?,
        &unmask(inland, 0.0)?,
        BandMathOp::Max,
    )?;
    let dry = logical_not(&unmask(water_presence, 0.0)?)?;
    let mut driver = update_mask(&combined, &dry)?;
    if let Some(domain) = valid_domain {
        driver = update_mask(&driver, domain)?;
    }

    let quantized = quantize(&driver, QUANTIZATION_FACTOR)?;
    info!(
        valid_cells = driver.valid_count(),
        masked_cells = driver.len() - driver.valid_count(),
        "composited water driver"
    );
    Ok(quantized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalEngine;
    use waterdriver_core::GeoTransform;

    fn raster(values: &[f64]) -> Raster<f64> {
        let mut r = Raster::from_vec(values.to_vec(), 1, values.len()).unwrap();
        r.set_transform(GeoTransform::north_up(0.0, 300.0, 300.0));
        r
    }

    const NAN: f64 = f64::NAN;

    #[test]
    fn test_max_with_masked_as_zero() {
        let coastal = raster(&[1.5, NAN, 0.2, NAN]);
        let inland = raster(&[0.5, 3.999, NAN, NAN]);
        let water = raster(&[0.0, 0.0, 0.0, 0.0]);

        let out = composite(&coastal, &inland, &water, None).unwrap();
        assert_eq!(out.data().as_slice().unwrap(), &[150, 399, 20, 0]);
        assert_eq!(out.nodata(), Some(i32::MIN));
    }

    #[test]
    fn test_water_cells_are_masked() {
        let coastal = raster(&[4.0, 4.0, 4.0]);
        let inland = raster(&[1.0, 1.0, 1.0]);
        let water = raster(&[1.0, 0.0, NAN]);

        let out = composite(&coastal, &inland, &water, None).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), i32::MIN);
        assert_eq!(out.get(0, 1).unwrap(), 400);
        assert_eq!(out.get(0, 2).unwrap(), 400);
    }

    #[test]
    fn test_valid_domain() {
        let coastal = raster(&[1.0, 1.0, 1.0]);
        let inland = raster(&[0.0, 0.0, 0.0]);
        let water = raster(&[0.0, 0.0, 0.0]);
        let domain = raster(&[1.0, 0.0, NAN]);

        let out = composite(&coastal, &inland, &water, Some(&domain)).unwrap();
        assert_eq!(out.data().as_slice().unwrap(), &[100, i32::MIN, i32::MIN]);
    }

    #[test]
    fn test_water_presence_mask() {
        let ocean = raster(&[1.0, 0.0, 0.0]);
        // Fine grid at 100 m under the 300 m cells
        let mut fine = Raster::filled(3, 9, 0.0);
        fine.set_transform(GeoTransform::north_up(0.0, 300.0, 100.0));
        for row in 0..3 {
            for col in 3..5 {
                fine.set(row, col, 1.0).unwrap();
            }
            fine.set(row, 6, 1.0).unwrap();
        }

        let water = water_presence_mask(&LocalEngine::default(), &ocean, &fine).unwrap();
        assert_eq!(water.data().as_slice().unwrap(), &[1.0, 1.0, 0.0]);
    }
}
