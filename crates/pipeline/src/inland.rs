//! Inland waterways and their influence
//!
//! Surface water is thresholded at the fine scale, narrow channels are
//! removed by a morphological opening, and only large connected networks
//! at the working scale count as navigable.

use tracing::{debug, info, warn};
use waterdriver_algorithms::algebra::{
    count_true, logical_and, logical_not, threshold, unmask, Comparison,
};
use waterdriver_algorithms::resample::Resampling;
use waterdriver_core::raster::Raster;

use crate::config::{DriverConfig, DriverKernels};
use crate::engine::{NeighborhoodReducer, RasterEngine};
use crate::error::Result;
use crate::influence::decayed_influence;

/// Layers of the inland waterway extraction
#[derive(Debug, Clone)]
pub struct InlandWaterways {
    /// Fine-scale water presence, 1 water, 0 dry
    pub presence: Raster<f64>,
    /// Fine-scale presence after the width filter
    pub opened: Raster<f64>,
    /// Working-scale navigable network, 1 navigable, 0 elsewhere
    pub waterways: Raster<f64>,
}

/// Cells whose occurrence is strictly above the threshold.
///
/// Occurrence is the percentage of observations with water; masked cells
/// were never observed as water and count as 0. The result has no masked
/// cells.
pub fn water_presence(surface_water: &Raster<f64>, config: &DriverConfig) -> Result<Raster<f64>> {
    surface_water.ensure_scale(config.fine_scale)?;
    Ok(threshold(
        &unmask(surface_water, 0.0)?,
        Comparison::Gt,
        config.occurrence_threshold,
    )?)
}

/// Opening with the river-width kernel: neighborhood minimum, then
/// neighborhood maximum over the same disk.
pub fn open_by_width<E: RasterEngine + ?Sized>(
    engine: &E,
    presence: &Raster<f64>,
    kernels: &DriverKernels,
) -> Result<Raster<f64>> {
    let eroded = engine.reduce_neighborhood(presence, NeighborhoodReducer::Min, &kernels.river_width)?;
    engine.reduce_neighborhood(&eroded, NeighborhoodReducer::Max, &kernels.river_width)
}

/// Working-scale cells of connected water networks large enough to be
/// navigable. Ocean cells are never part of a network.
pub fn navigable_waterways<E: RasterEngine + ?Sized>(
    engine: &E,
    opened: &Raster<f64>,
    ocean_mask: &Raster<f64>,
    config: &DriverConfig,
) -> Result<Raster<f64>> {
    ocean_mask.ensure_scale(config.working_scale)?;

    let coarse = unmask(&engine.resample_to(opened, ocean_mask, Resampling::Max)?, 0.0)?;
    let inland = logical_and(&coarse, &logical_not(ocean_mask)?)?;

    let counts = engine.connected_pixel_count(&inland, config.connected_pixel_minimum, true)?;
    let navigable = threshold(
        &unmask(&counts, 0.0)?,
        Comparison::Gte,
        config.connected_pixel_minimum as f64,
    )?;
    debug!(
        candidate_cells = count_true(&inland),
        navigable_cells = count_true(&navigable),
        "connectivity filter"
    );
    Ok(navigable)
}

/// Full extraction, keeping the intermediate layers.
pub fn extract_inland_waterways<E: RasterEngine + ?Sized>(
    engine: &E,
    surface_water: &Raster<f64>,
    ocean_mask: &Raster<f64>,
    kernels: &DriverKernels,
    config: &DriverConfig,
) -> Result<InlandWaterways> {
    let presence = water_presence(surface_water, config)?;
    let opened = open_by_width(engine, &presence, kernels)?;
    debug!(
        water_cells = count_true(&presence),
        wide_cells = count_true(&opened),
        "width filter"
    );
    let waterways = navigable_waterways(engine, &opened, ocean_mask, config)?;
    Ok(InlandWaterways {
        presence,
        opened,
        waterways,
    })
}

/// Binary navigable inland network at the working scale.
pub fn inland_waterways<E: RasterEngine + ?Sized>(
    engine: &E,
    surface_water: &Raster<f64>,
    ocean_mask: &Raster<f64>,
    kernels: &DriverKernels,
    config: &DriverConfig,
) -> Result<Raster<f64>> {
    Ok(extract_inland_waterways(engine, surface_water, ocean_mask, kernels, config)?.waterways)
}

/// Decayed influence of the inland network, masked to non-ocean cells.
pub fn inland_influence<E: RasterEngine + ?Sized>(
    engine: &E,
    waterways: &Raster<f64>,
    ocean_mask: &Raster<f64>,
    kernels: &DriverKernels,
    config: &DriverConfig,
) -> Result<Raster<f64>> {
    waterways.ensure_same_grid(ocean_mask)?;
    let land = logical_not(ocean_mask)?;
    let influence = decayed_influence(engine, waterways, &land, kernels, config)?;

    if influence.is_fully_masked() {
        warn!("no navigable inland water; inland influence is fully masked");
    }
    info!(
        navigable_cells = count_true(waterways),
        influenced_cells = influence.valid_count(),
        "computed inland influence"
    );
    Ok(influence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalEngine;
    use waterdriver_core::GeoTransform;
    use waterdriver_parallel::ProcessingMode;

    fn config() -> DriverConfig {
        DriverConfig {
            working_scale: 10.0,
            fine_scale: 10.0,
            min_navigable_width: 30.0,
            connected_pixel_minimum: 10,
            ..DriverConfig::default()
        }
    }

    fn grid(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::north_up(0.0, rows as f64 * 10.0, 10.0));
        r
    }

    /// 9-cell wide river in columns 2..=10, 10 m channel in column 15
    fn occurrence(with_channel: bool) -> Raster<f64> {
        let mut r = grid(20, 20, 0.0);
        for row in 0..20 {
            for col in 2..=10 {
                r.set(row, col, 90.0).unwrap();
            }
            if with_channel {
                r.set(row, 15, 90.0).unwrap();
            }
        }
        r
    }

    #[test]
    fn test_presence_polarity() {
        let mut occ = grid(1, 4, 40.0);
        occ.set(0, 1, 41.0).unwrap();
        occ.set(0, 2, f64::NAN).unwrap();
        occ.set(0, 3, 100.0).unwrap();

        let presence = water_presence(&occ, &config()).unwrap();
        assert_eq!(presence.data().as_slice().unwrap(), &[0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_presence_checks_scale() {
        let occ = grid(2, 2, 50.0);
        let cfg = DriverConfig {
            fine_scale: 30.0,
            ..config()
        };
        assert!(water_presence(&occ, &cfg).is_err());
    }

    #[test]
    fn test_narrow_channel_is_removed() {
        let cfg = config();
        let kernels = DriverKernels::from_config(&cfg).unwrap();
        let ocean = grid(20, 20, 0.0);

        let layers =
            extract_inland_waterways(&LocalEngine::default(), &occurrence(true), &ocean, &kernels, &cfg)
                .unwrap();

        assert_eq!(layers.presence.get(7, 15).unwrap(), 1.0);
        assert_eq!(layers.opened.get(7, 15).unwrap(), 0.0);
        for row in 0..20 {
            for col in 2..=10 {
                assert_eq!(layers.opened.get(row, col).unwrap(), 1.0);
            }
        }
        assert_eq!(count_true(&layers.waterways), 20 * 9);
    }

    #[test]
    fn test_channel_contributes_no_influence() {
        let cfg = config();
        let kernels = DriverKernels::from_config(&cfg).unwrap();
        let engine = LocalEngine::default();
        let ocean = grid(20, 20, 0.0);

        let influence = |with_channel: bool| {
            let waterways =
                inland_waterways(&engine, &occurrence(with_channel), &ocean, &kernels, &cfg).unwrap();
            inland_influence(&engine, &waterways, &ocean, &kernels, &cfg).unwrap()
        };

        let with = influence(true);
        let without = influence(false);
        assert_eq!(with.data(), without.data());
    }

    #[test]
    fn test_width_opening_is_idempotent() {
        let cfg = config();
        let kernels = DriverKernels::from_config(&cfg).unwrap();
        let engine = LocalEngine::new(9, ProcessingMode::Parallel);

        let mut presence = grid(50, 50, 0.0);
        for row in 0..50 {
            for col in 0..50 {
                let blocky = (row / 4 + col / 3) % 3 != 0;
                let speckle = (row * 31 + col * 17) % 11 == 0;
                if blocky || speckle {
                    presence.set(row, col, 1.0).unwrap();
                }
            }
        }

        let once = open_by_width(&engine, &presence, &kernels).unwrap();
        let twice = open_by_width(&engine, &once, &kernels).unwrap();
        assert_eq!(once.data(), twice.data());
        assert!(count_true(&once) < count_true(&presence));
        assert!(count_true(&once) > 0);
    }

    #[test]
    fn test_connectivity_boundary() {
        let cfg = config();
        let ocean = grid(5, 12, 0.0);
        let mut opened = grid(5, 12, 0.0);
        // Exactly 10 connected cells (kept) and 9 (dropped)
        for col in 0..10 {
            opened.set(0, col, 1.0).unwrap();
        }
        for col in 0..9 {
            opened.set(3, col, 1.0).unwrap();
        }

        let navigable = navigable_waterways(&LocalEngine::default(), &opened, &ocean, &cfg).unwrap();
        assert_eq!(navigable.get(0, 0).unwrap(), 1.0);
        assert_eq!(navigable.get(0, 9).unwrap(), 1.0);
        assert_eq!(navigable.get(3, 0).unwrap(), 0.0);
        assert_eq!(count_true(&navigable), 10);
    }

    #[test]
    fn test_ocean_cells_never_navigable() {
        let cfg = DriverConfig {
            connected_pixel_minimum: 3,
            ..config()
        };
        let mut ocean = grid(3, 6, 0.0);
        let opened = grid(3, 6, 1.0);
        for row in 0..3 {
            ocean.set(row, 0, 1.0).unwrap();
        }

        let navigable = navigable_waterways(&LocalEngine::default(), &opened, &ocean, &cfg).unwrap();
        for row in 0..3 {
            assert_eq!(navigable.get(row, 0).unwrap(), 0.0);
            assert_eq!(navigable.get(row, 3).unwrap(), 1.0);
        }
    }
}
