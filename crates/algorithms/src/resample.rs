//! Moving rasters between scales
//!
//! Every stage of the pipeline runs at an explicit scale, so rasters are
//! regularly brought onto a coarser or finer grid in the same CRS. Coarsening
//! aggregates the source cells whose centers fall inside each target cell;
//! refining (or any target cell that contains no source center) samples the
//! source cell under the target center.
//!
//! Reprojection between CRSs is not supported: inputs must already share
//! the working CRS.

use crate::algebra::cell;
use crate::maybe_rayon::*;
use waterdriver_core::raster::{GeoTransform, Raster};
use waterdriver_core::{Error, Result};

/// Resampling method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    /// Source cell under the target cell center
    #[default]
    Nearest,
    /// Mean of the unmasked source cells
    Mean,
    /// Maximum of the unmasked source cells
    Max,
    /// Minimum of the unmasked source cells
    Min,
}

/// Empty raster covering `raster`'s extent with cells of `scale` meters.
///
/// The upper-left corner is kept; the last row and column may extend past
/// the source extent.
pub fn grid_at_scale(raster: &Raster<f64>, scale: f64) -> Result<Raster<f64>> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "scale",
            value: scale.to_string(),
            reason: "target scale must be a positive number of meters".to_string(),
        });
    }
    let tf = raster.transform();
    let width = raster.cols() as f64 * tf.pixel_width.abs();
    let height = raster.rows() as f64 * tf.pixel_height.abs();
    let cols = ((width / scale) - 1e-9).ceil().max(1.0) as usize;
    let rows = ((height / scale) - 1e-9).ceil().max(1.0) as usize;

    let mut out = Raster::filled(rows, cols, f64::NAN);
    out.set_transform(tf.with_cell_size(scale));
    out.set_crs(raster.crs().cloned());
    out.set_nodata(Some(f64::NAN));
    Ok(out)
}

/// Resample `raster` to cells of `scale` meters over the same extent.
pub fn resample(raster: &Raster<f64>, scale: f64, method: Resampling) -> Result<Raster<f64>> {
    if raster.transform().has_scale(scale) {
        return Ok(raster.clone());
    }
    let template = grid_at_scale(raster, scale)?;
    resample_to(raster, &template, method)
}

/// Resample `raster` onto the grid of `template`.
///
/// Only the template's grid (shape, transform, CRS) is used, never its
/// values. Both rasters must be in the same CRS when both declare one.
pub fn resample_to(
    raster: &Raster<f64>,
    template: &Raster<f64>,
    method: Resampling,
) -> Result<Raster<f64>> {
    if let (Some(a), Some(b)) = (raster.crs(), template.crs()) {
        if !a.is_equivalent(b) {
            return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
        }
    }
    if raster.same_grid(template) {
        return Ok(raster.clone());
    }

    let src_tf = *raster.transform();
    let dst_tf = *template.transform();
    let (src_rows, src_cols) = raster.shape();
    let (rows, cols) = template.shape();
    let nodata = raster.nodata();

    let sample = |col_f: f64, row_f: f64| -> f64 {
        if !(col_f >= 0.0 && row_f >= 0.0) {
            return f64::NAN;
        }
        let (c, r) = (col_f.floor() as usize, row_f.floor() as usize);
        if r >= src_rows || c >= src_cols {
            return f64::NAN;
        }
        let v = unsafe { raster.get_unchecked(r, c) };
        cell(v, nodata).unwrap_or(f64::NAN)
    };

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let (cx, cy) = dst_tf.pixel_to_geo(col, row);
                    let (center_col, center_row) = src_tf.geo_to_pixel(cx, cy);

                    if method == Resampling::Nearest {
                        return sample(center_col, center_row);
                    }

                    let (cols_in, rows_in) = footprint(&src_tf, &dst_tf, col, row, src_cols, src_rows);
                    if cols_in.is_empty() || rows_in.is_empty() {
                        return sample(center_col, center_row);
                    }

                    let mut acc: Option<f64> = None;
                    let mut count = 0usize;
                    for r in rows_in.clone() {
                        for c in cols_in.clone() {
                            let v = unsafe { raster.get_unchecked(r, c) };
                            let Some(v) = cell(v, nodata) else {
                                continue;
                            };
                            count += 1;
                            acc = Some(match (acc, method) {
                                (None, _) => v,
                                (Some(a), Resampling::Max) => a.max(v),
                                (Some(a), Resampling::Min) => a.min(v),
                                (Some(a), _) => a + v,
                            });
                        }
                    }

                    match (acc, method) {
                        (None, _) => f64::NAN,
                        (Some(sum), Resampling::Mean) => sum / count as f64,
                        (Some(v), _) => v,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    template.with_data(data, Some(f64::NAN))
}

/// Source column and row ranges whose cell centers fall inside target cell
/// (col, row), clamped to the source grid.
fn footprint(
    src: &GeoTransform,
    dst: &GeoTransform,
    col: usize,
    row: usize,
    src_cols: usize,
    src_rows: usize,
) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
    let (x0, y0) = dst.pixel_to_geo_corner(col, row);
    let (x1, y1) = dst.pixel_to_geo_corner(col + 1, row + 1);
    let (a_col, a_row) = src.geo_to_pixel(x0, y0);
    let (b_col, b_row) = src.geo_to_pixel(x1, y1);

    (
        center_range(a_col.min(b_col), a_col.max(b_col), src_cols),
        center_range(a_row.min(b_row), a_row.max(b_row), src_rows),
    )
}

/// Indices `i` with `lo <= i + 0.5 < hi`, clamped to `0..len`.
fn center_range(lo: f64, hi: f64, len: usize) -> std::ops::Range<usize> {
    let start = (lo - 0.5 - 1e-9).ceil().max(0.0);
    let end = (hi - 0.5 - 1e-9).ceil().max(0.0).min(len as f64);
    if start >= end {
        return 0..0;
    }
    start as usize..end as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use waterdriver_core::CRS;

    fn make(rows: usize, cols: usize, scale: f64) -> Raster<f64> {
        let data: Vec<f64> = (0..rows * cols).map(|i| i as f64).collect();
        let mut r = Raster::from_vec(data, rows, cols).unwrap();
        r.set_transform(GeoTransform::north_up(1000.0, 5000.0, scale));
        r
    }

    #[test]
    fn test_grid_at_scale_covers_extent() {
        let r = make(10, 7, 30.0);
        let g = grid_at_scale(&r, 90.0).unwrap();
        assert_eq!(g.shape(), (4, 3));
        assert_relative_eq!(g.scale(), 90.0);
        assert_relative_eq!(g.transform().origin_x, 1000.0);
    }

    #[test]
    fn test_mean_and_max_aggregation() {
        // 4x4 at 10 m to 2x2 at 20 m
        let r = make(4, 4, 10.0);
        let mean = resample(&r, 20.0, Resampling::Mean).unwrap();
        assert_eq!(mean.shape(), (2, 2));
        assert_relative_eq!(mean.get(0, 0).unwrap(), (0.0 + 1.0 + 4.0 + 5.0) / 4.0);

        let max = resample(&r, 20.0, Resampling::Max).unwrap();
        assert_relative_eq!(max.get(1, 1).unwrap(), 15.0);

        let min = resample(&r, 20.0, Resampling::Min).unwrap();
        assert_relative_eq!(min.get(1, 1).unwrap(), 10.0);
    }

    #[test]
    fn test_aggregation_skips_masked() {
        let mut r = make(2, 2, 10.0);
        r.set(0, 0, f64::NAN).unwrap();
        let mean = resample(&r, 20.0, Resampling::Mean).unwrap();
        assert_relative_eq!(mean.get(0, 0).unwrap(), 2.0);

        let mut all_masked = Raster::filled(2, 2, f64::NAN);
        all_masked.set_transform(GeoTransform::north_up(0.0, 20.0, 10.0));
        assert!(resample(&all_masked, 20.0, Resampling::Max).unwrap().is_fully_masked());
    }

    #[test]
    fn test_nearest_refines() {
        let r = make(2, 2, 20.0);
        let fine = resample(&r, 10.0, Resampling::Nearest).unwrap();
        assert_eq!(fine.shape(), (4, 4));
        assert_eq!(fine.get(0, 1).unwrap(), 0.0);
        assert_eq!(fine.get(3, 2).unwrap(), 3.0);

        // Aggregating methods fall back to nearest when refining
        let fine_mean = resample(&r, 10.0, Resampling::Mean).unwrap();
        assert_eq!(fine_mean.data(), fine.data());
    }

    #[test]
    fn test_resample_to_same_grid_is_identity() {
        let r = make(3, 3, 30.0);
        let out = resample_to(&r, &r, Resampling::Max).unwrap();
        assert_eq!(out.data(), r.data());
    }

    #[test]
    fn test_crs_mismatch() {
        let mut r = make(2, 2, 10.0);
        r.set_crs(Some(CRS::from_epsg(3857)));
        let mut t = grid_at_scale(&r, 20.0).unwrap();
        t.set_crs(Some(CRS::from_epsg(32633)));
        assert!(matches!(
            resample_to(&r, &t, Resampling::Nearest),
            Err(Error::CrsMismatch(_, _))
        ));
    }
}
