//! Raster evaluation service
//!
//! Stages never call the primitives directly for anything that needs a
//! neighborhood, a distance, a labeling or a change of grid. They go
//! through [`RasterEngine`], so a different backend can evaluate the same
//! pipeline. Cell-wise algebra has no such seam: it is applied to rasters
//! directly through `waterdriver_algorithms::algebra`.
//!
//! [`LocalEngine`] evaluates everything in memory. Neighborhood reductions
//! and bounded Euclidean distances run tiled, with a halo one cell wider
//! than the kernel reach; accumulated cost, labeling, rasterization and
//! resampling run on the whole grid.

use tracing::debug;
use waterdriver_algorithms::components;
use waterdriver_algorithms::distance::{self, CostDistanceParams};
use waterdriver_algorithms::morphology::{self, StructuringElement};
use waterdriver_algorithms::rasterize::{self, RasterizeReducer};
use waterdriver_algorithms::resample::{self, Resampling};
use waterdriver_core::raster::{Kernel, Raster};
use waterdriver_core::vector::FeatureCollection;
use waterdriver_parallel::{ProcessingMode, TiledProcessor};

use crate::config::ProcessingConfig;
use crate::error::Result;

/// Reducer of a kernel neighborhood
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborhoodReducer {
    Min,
    Max,
}

/// Operations the driver stages need from an evaluation backend
pub trait RasterEngine: Send + Sync {
    /// Min or max over `kernel`'s footprint at the raster's own scale
    fn reduce_neighborhood(
        &self,
        raster: &Raster<f64>,
        reducer: NeighborhoodReducer,
        kernel: &Kernel,
    ) -> Result<Raster<f64>>;

    /// Distance in meters to the nearest non-zero cell, masked beyond the
    /// kernel radius
    fn distance(&self, sources: &Raster<f64>, kernel: &Kernel) -> Result<Raster<f64>>;

    /// Accumulated cost from the non-zero cells of `sources` over `cost`,
    /// masked beyond `max_cost`
    fn cumulative_cost(
        &self,
        cost: &Raster<f64>,
        sources: &Raster<f64>,
        max_cost: f64,
    ) -> Result<Raster<f64>>;

    /// Capped size of the component each non-zero cell belongs to
    fn connected_pixel_count(
        &self,
        mask: &Raster<f64>,
        max_size: usize,
        eight_connected: bool,
    ) -> Result<Raster<f64>>;

    /// Burn a numeric feature attribute onto `template`'s grid
    fn rasterize(
        &self,
        features: &FeatureCollection,
        attribute: &str,
        reducer: RasterizeReducer,
        template: &Raster<f64>,
    ) -> Result<Raster<f64>>;

    /// Same extent, cells of `scale` meters
    fn resample(&self, raster: &Raster<f64>, scale: f64, method: Resampling) -> Result<Raster<f64>>;

    /// Onto `template`'s grid
    fn resample_to(
        &self,
        raster: &Raster<f64>,
        template: &Raster<f64>,
        method: Resampling,
    ) -> Result<Raster<f64>>;
}

/// In-memory evaluation on top of the algorithm primitives
#[derive(Debug, Clone)]
pub struct LocalEngine {
    tile_size: usize,
    mode: ProcessingMode,
}

impl LocalEngine {
    pub fn new(tile_size: usize, mode: ProcessingMode) -> Self {
        Self {
            tile_size: tile_size.max(1),
            mode,
        }
    }

    pub fn from_config(processing: &ProcessingConfig) -> Self {
        Self::new(processing.tile_size, processing.mode())
    }

    fn tiled(&self, halo: usize) -> TiledProcessor {
        TiledProcessor::new(self.tile_size, halo).with_mode(self.mode)
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::from_config(&ProcessingConfig::default())
    }
}

impl RasterEngine for LocalEngine {
    fn reduce_neighborhood(
        &self,
        raster: &Raster<f64>,
        reducer: NeighborhoodReducer,
        kernel: &Kernel,
    ) -> Result<Raster<f64>> {
        let element = StructuringElement::from_kernel(kernel, raster.scale())?;
        let halo = element.radius();
        debug!(kernel = kernel.name(), ?reducer, halo, "neighborhood reduction");

        let out = self.tiled(halo).apply(raster, |tile| match reducer {
            NeighborhoodReducer::Min => morphology::erode(tile, &element),
            NeighborhoodReducer::Max => morphology::dilate(tile, &element),
        })?;
        Ok(out)
    }

    fn distance(&self, sources: &Raster<f64>, kernel: &Kernel) -> Result<Raster<f64>> {
        kernel.validate()?;
        let bound = kernel.radius();
        let halo = kernel.reach_cells(sources.scale()) + 1;
        debug!(kernel = kernel.name(), bound, halo, "bounded distance");

        let out = self
            .tiled(halo)
            .apply(sources, |tile| distance::euclidean_distance(tile, bound))?;
        Ok(out)
    }

    fn cumulative_cost(
        &self,
        cost: &Raster<f64>,
        sources: &Raster<f64>,
        max_cost: f64,
    ) -> Result<Raster<f64>> {
        cost.ensure_same_grid(sources)?;
        let params = CostDistanceParams::from_mask(sources).with_max_cost(max_cost);
        debug!(sources = params.sources.len(), max_cost, "cumulative cost");

        let out = self.mode.install(|| distance::cost_distance(cost, params))?;
        Ok(out)
    }

    fn connected_pixel_count(
        &self,
        mask: &Raster<f64>,
        max_size: usize,
        eight_connected: bool,
    ) -> Result<Raster<f64>> {
        Ok(components::connected_pixel_count(mask, max_size, eight_connected)?)
    }

    fn rasterize(
        &self,
        features: &FeatureCollection,
        attribute: &str,
        reducer: RasterizeReducer,
        template: &Raster<f64>,
    ) -> Result<Raster<f64>> {
        Ok(rasterize::rasterize(features, attribute, reducer, template)?)
    }

    fn resample(&self, raster: &Raster<f64>, scale: f64, method: Resampling) -> Result<Raster<f64>> {
        let out = self.mode.install(|| resample::resample(raster, scale, method))?;
        Ok(out)
    }

    fn resample_to(
        &self,
        raster: &Raster<f64>,
        template: &Raster<f64>,
        method: Resampling,
    ) -> Result<Raster<f64>> {
        let out = self
            .mode
            .install(|| resample::resample_to(raster, template, method))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use waterdriver_core::GeoTransform;

    fn grid(rows: usize, cols: usize, scale: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, 0.0);
        r.set_transform(GeoTransform::north_up(0.0, rows as f64 * scale, scale));
        r
    }

    #[test]
    fn test_tiled_distance_matches_untiled() {
        let mut sources = grid(60, 45, 100.0);
        for &(r, c) in &[(3, 3), (30, 40), (59, 0), (17, 22)] {
            sources.set(r, c, 1.0).unwrap();
        }
        let kernel = Kernel::euclidean("indirect", 1500.0);

        let tiled = LocalEngine::new(8, ProcessingMode::Parallel)
            .distance(&sources, &kernel)
            .unwrap();
        let whole = distance::euclidean_distance(&sources, 1500.0).unwrap();

        for (a, b) in tiled.data().iter().zip(whole.data().iter()) {
            if b.is_nan() {
                assert!(a.is_nan());
            } else {
                assert_relative_eq!(*a, *b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_tiled_reduction_matches_untiled() {
        let mut r = grid(40, 40, 10.0);
        for row in 0..40 {
            for col in 0..40 {
                if (row * 3 + col * 5) % 7 < 3 {
                    r.set(row, col, 1.0).unwrap();
                }
            }
        }
        let kernel = Kernel::circle("river_width", 30.0);
        let element = StructuringElement::from_kernel(&kernel, 10.0).unwrap();

        let engine = LocalEngine::new(7, ProcessingMode::Sequential);
        let min = engine
            .reduce_neighborhood(&r, NeighborhoodReducer::Min, &kernel)
            .unwrap();
        assert_eq!(min.data(), morphology::erode(&r, &element).unwrap().data());

        let max = engine
            .reduce_neighborhood(&r, NeighborhoodReducer::Max, &kernel)
            .unwrap();
        assert_eq!(max.data(), morphology::dilate(&r, &element).unwrap().data());
    }

    #[test]
    fn test_cumulative_cost_uses_scale() {
        let mut sources = grid(1, 6, 1000.0);
        sources.set(0, 0, 1.0).unwrap();
        let cost = sources.like(1.0);

        let out = LocalEngine::default()
            .cumulative_cost(&cost, &sources, 3000.0)
            .unwrap();
        assert_relative_eq!(out.get(0, 3).unwrap(), 3000.0);
        assert!(out.get(0, 4).unwrap().is_nan());
    }
}
