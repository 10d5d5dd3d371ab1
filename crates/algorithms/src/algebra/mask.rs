//! Mask handling and logical operations on binary rasters
//!
//! Binary rasters hold 0.0 / 1.0 and may carry masked (NaN) cells, which
//! mean "absent", not "false".

use waterdriver_core::raster::Raster;
use waterdriver_core::Result;

use super::{cell, map_cells, zip_cells};

/// Comparison used by [`threshold`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl Comparison {
    fn holds(self, value: f64, reference: f64) -> bool {
        match self {
            Comparison::Gt => value > reference,
            Comparison::Gte => value >= reference,
            Comparison::Lt => value < reference,
            Comparison::Lte => value <= reference,
            Comparison::Eq => value == reference,
        }
    }
}

fn truth(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// Replace nodata-valued cells with NaN so later stages only test for NaN.
pub fn mask_nodata(raster: &Raster<f64>) -> Result<Raster<f64>> {
    map_cells(raster, |v| v.unwrap_or(f64::NAN))
}

/// Fill masked cells with `fill`; the result has no masked cells.
pub fn unmask(raster: &Raster<f64>, fill: f64) -> Result<Raster<f64>> {
    map_cells(raster, |v| v.unwrap_or(fill))
}

/// Mask every cell where `mask` is masked or zero.
pub fn update_mask(raster: &Raster<f64>, mask: &Raster<f64>) -> Result<Raster<f64>> {
    zip_cells(raster, mask, |v, m| match (v, m) {
        (Some(x), Some(keep)) if keep != 0.0 => x,
        _ => f64::NAN,
    })
}

/// Mask every cell holding zero.
pub fn self_mask(raster: &Raster<f64>) -> Result<Raster<f64>> {
    map_cells(raster, |v| match v {
        Some(x) if x != 0.0 => x,
        _ => f64::NAN,
    })
}

/// Binary comparison against a constant; masked cells stay masked.
pub fn threshold(raster: &Raster<f64>, comparison: Comparison, reference: f64) -> Result<Raster<f64>> {
    map_cells(raster, |v| v.map_or(f64::NAN, |x| truth(comparison.holds(x, reference))))
}

/// 1 where the cell holds a value, 0 where it is masked. Never masked.
pub fn defined(raster: &Raster<f64>) -> Result<Raster<f64>> {
    map_cells(raster, |v| truth(v.is_some()))
}

/// Logical AND of two binary rasters; masked if either side is masked.
pub fn logical_and(a: &Raster<f64>, b: &Raster<f64>) -> Result<Raster<f64>> {
    zip_cells(a, b, |x, y| match (x, y) {
        (Some(x), Some(y)) => truth(x != 0.0 && y != 0.0),
        _ => f64::NAN,
    })
}

/// Logical OR of two binary rasters; masked if either side is masked.
pub fn logical_or(a: &Raster<f64>, b: &Raster<f64>) -> Result<Raster<f64>> {
    zip_cells(a, b, |x, y| match (x, y) {
        (Some(x), Some(y)) => truth(x != 0.0 || y != 0.0),
        _ => f64::NAN,
    })
}

/// Logical NOT of a binary raster; masked cells stay masked.
pub fn logical_not(raster: &Raster<f64>) -> Result<Raster<f64>> {
    map_cells(raster, |v| v.map_or(f64::NAN, |x| truth(x == 0.0)))
}

/// Number of unmasked, non-zero cells
pub fn count_true(raster: &Raster<f64>) -> usize {
    let nodata = raster.nodata();
    raster
        .data()
        .iter()
        .filter(|&&v| cell(v, nodata).map_or(false, |x| x != 0.0))
        .count()
}

/// Multiply by `factor` and truncate toward zero into an integer raster.
///
/// Masked cells become `i32::MIN`, which is also set as nodata.
pub fn quantize(raster: &Raster<f64>, factor: f64) -> Result<Raster<i32>> {
    let nodata = raster.nodata();
    let data: Vec<i32> = raster
        .data()
        .iter()
        .map(|&v| match cell(v, nodata) {
            Some(x) => (x * factor).trunc() as i32,
            None => i32::MIN,
        })
        .collect();
    raster.with_data(data, Some(i32::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use waterdriver_core::{Error, GeoTransform};

    fn raster(values: &[f64], rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::from_vec(values.to_vec(), rows, cols).unwrap();
        r.set_transform(GeoTransform::north_up(0.0, 0.0, 300.0));
        r
    }

    const NAN: f64 = f64::NAN;

    #[test]
    fn test_unmask_fills_only_masked() {
        let r = raster(&[1.0, NAN, 3.0, NAN], 2, 2);
        let out = unmask(&r, 0.0).unwrap();
        assert_eq!(out.data().iter().copied().collect::<Vec<_>>(), vec![1.0, 0.0, 3.0, 0.0]);
    }

    #[test]
    fn test_nodata_value_becomes_nan() {
        let mut r = raster(&[-9999.0, 2.0], 1, 2);
        r.set_nodata(Some(-9999.0));
        let out = mask_nodata(&r).unwrap();
        assert!(out.get(0, 0).unwrap().is_nan());
        assert_eq!(out.get(0, 1).unwrap(), 2.0);
    }

    #[test]
    fn test_update_mask_treats_zero_and_nan_as_masked() {
        let values = raster(&[5.0, 5.0, 5.0], 1, 3);
        let mask = raster(&[1.0, 0.0, NAN], 1, 3);
        let out = update_mask(&values, &mask).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 5.0);
        assert!(out.get(0, 1).unwrap().is_nan());
        assert!(out.get(0, 2).unwrap().is_nan());
    }

    #[test]
    fn test_threshold_polarity() {
        let r = raster(&[39.0, 40.0, 41.0, NAN], 1, 4);
        let above = threshold(&r, Comparison::Gt, 40.0).unwrap();
        assert_eq!(above.get(0, 0).unwrap(), 0.0);
        assert_eq!(above.get(0, 1).unwrap(), 0.0);
        assert_eq!(above.get(0, 2).unwrap(), 1.0);
        assert!(above.get(0, 3).unwrap().is_nan());
    }

    #[test]
    fn test_logical_ops() {
        let a = raster(&[1.0, 1.0, 0.0, 0.0], 2, 2);
        let b = raster(&[1.0, 0.0, 1.0, 0.0], 2, 2);
        assert_eq!(count_true(&logical_and(&a, &b).unwrap()), 1);
        assert_eq!(count_true(&logical_or(&a, &b).unwrap()), 3);
        assert_eq!(count_true(&logical_not(&a).unwrap()), 2);
    }

    #[test]
    fn test_shifted_grids_are_not_combined() {
        let a = raster(&[1.0, 1.0, 0.0, 0.0], 2, 2);
        let mut b = raster(&[1.0, 0.0, 1.0, 0.0], 2, 2);
        b.set_transform(GeoTransform::north_up(600.0, 0.0, 300.0));
        assert!(matches!(logical_and(&a, &b), Err(Error::GridMismatch { .. })));
        assert!(matches!(update_mask(&a, &b), Err(Error::GridMismatch { .. })));
    }

    #[test]
    fn test_defined_and_self_mask() {
        let r = raster(&[0.0, 2.0, NAN], 1, 3);
        let d = defined(&r).unwrap();
        assert_eq!(d.data().iter().copied().collect::<Vec<_>>(), vec![1.0, 1.0, 0.0]);
        let s = self_mask(&r).unwrap();
        assert!(s.get(0, 0).unwrap().is_nan());
        assert_eq!(s.valid_count(), 1);
    }

    #[test]
    fn test_quantize_truncates() {
        let r = raster(&[3.999, 0.004, NAN, 4.0], 1, 4);
        let q = quantize(&r, 100.0).unwrap();
        assert_eq!(q.get(0, 0).unwrap(), 399);
        assert_eq!(q.get(0, 1).unwrap(), 0);
        assert_eq!(q.get(0, 2).unwrap(), i32::MIN);
        assert_eq!(q.get(0, 3).unwrap(), 400);
        assert_eq!(q.nodata(), Some(i32::MIN));
    }
}
