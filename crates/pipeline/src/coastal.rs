//! Coastal influence
//!
//! Ocean near coastal settlements is treated as navigable, and land near
//! navigable ocean receives a decayed influence. The stage runs at the
//! working scale except for the navigation transform, which runs at the
//! coarser navigation scale because its radius spans hundreds of working
//! cells.

use tracing::{debug, info, warn};
use waterdriver_algorithms::algebra::{
    count_true, defined, logical_and, logical_not, threshold, unmask, update_mask, Comparison,
};
use waterdriver_algorithms::resample::Resampling;
use waterdriver_core::raster::Raster;

use crate::config::{DriverConfig, DriverKernels, NavigationMetric};
use crate::engine::RasterEngine;
use crate::error::Result;
use crate::influence::decayed_influence;

/// Intermediate and final layers of the coastal stage, all at working scale
#[derive(Debug, Clone)]
pub struct CoastalLayers {
    /// Distance in meters from land cells to the ocean, masked beyond the
    /// settlement distance and on ocean cells
    pub distance_to_ocean: Raster<f64>,
    /// 1 for coastal settlement cells, 0 elsewhere
    pub settlements: Raster<f64>,
    /// 1 for ocean cells within navigation distance of a settlement
    pub navigable_coast: Raster<f64>,
    /// Decayed influence on land, masked elsewhere
    pub influence: Raster<f64>,
}

/// Coastal influence field from the ocean mask and population density.
///
/// Both rasters must lie on the working grid. Masked density counts as 0.
/// Without any coastal settlement the influence field is fully masked and a
/// warning is logged.
pub fn coastal_influence<E: RasterEngine + ?Sized>(
    engine: &E,
    ocean_mask: &Raster<f64>,
    population: &Raster<f64>,
    kernels: &DriverKernels,
    config: &DriverConfig,
) -> Result<CoastalLayers> {
    ocean_mask.ensure_scale(config.working_scale)?;
    ocean_mask.ensure_same_grid(population)?;

    let land = logical_not(ocean_mask)?;

    let distance_to_ocean = update_mask(
        &engine.distance(ocean_mask, &kernels.coastal_settlement)?,
        &land,
    )?;
    let dense = threshold(
        &unmask(population, 0.0)?,
        Comparison::Gte,
        config.settlement_density_threshold,
    )?;
    let settlements = logical_and(&defined(&distance_to_ocean)?, &dense)?;
    let settlement_count = count_true(&settlements);
    debug!(settlement_count, "coastal settlements");

    if settlement_count == 0 {
        warn!("no coastal settlements; coastal influence is fully masked");
        return Ok(CoastalLayers {
            navigable_coast: ocean_mask.like(0.0),
            influence: masked_like(ocean_mask),
            distance_to_ocean,
            settlements,
        });
    }

    let navigable_coast = navigable_coast(engine, ocean_mask, &settlements, kernels, config)?;
    let influence = decayed_influence(engine, &navigable_coast, &land, kernels, config)?;

    if influence.is_fully_masked() {
        warn!("coastal influence is fully masked");
    }
    info!(
        navigable_cells = count_true(&navigable_coast),
        influenced_cells = influence.valid_count(),
        "computed coastal influence"
    );

    Ok(CoastalLayers {
        distance_to_ocean,
        settlements,
        navigable_coast,
        influence,
    })
}

/// Ocean cells within the navigation distance of any settlement.
///
/// The settlement mask is coarsened to the navigation scale with max
/// aggregation, the bounded transform runs there, and its footprint comes
/// back to the working grid by nearest neighbour.
pub fn navigable_coast<E: RasterEngine + ?Sized>(
    engine: &E,
    ocean_mask: &Raster<f64>,
    settlements: &Raster<f64>,
    kernels: &DriverKernels,
    config: &DriverConfig,
) -> Result<Raster<f64>> {
    let coarse = engine.resample(settlements, config.navigation_scale, Resampling::Max)?;
    debug!(
        scale = coarse.scale(),
        metric = ?config.navigation_metric,
        "navigation transform"
    );

    let reach = match config.navigation_metric {
        NavigationMetric::Euclidean => engine.distance(&coarse, &kernels.coastal_navigation)?,
        NavigationMetric::CumulativeCost => {
            let cost = coarse.like(1.0);
            engine.cumulative_cost(&cost, &coarse, config.navigation_distance)?
        }
    };

    let reach = engine.resample_to(&reach, ocean_mask, Resampling::Nearest)?;
    Ok(logical_and(ocean_mask, &defined(&reach)?)?)
}

fn masked_like(template: &Raster<f64>) -> Raster<f64> {
    let mut out = template.like(f64::NAN);
    out.set_nodata(Some(f64::NAN));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalEngine;
    use crate::influence::decay;
    use approx::assert_relative_eq;
    use waterdriver_core::GeoTransform;

    fn config() -> DriverConfig {
        DriverConfig {
            working_scale: 10.0,
            fine_scale: 10.0,
            navigation_scale: 10.0,
            indirect_influence_scale: 10.0,
            decay_constant: -0.0003,
            ..DriverConfig::default()
        }
    }

    fn grid(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(10, 10, value);
        r.set_transform(GeoTransform::north_up(0.0, 100.0, 10.0));
        r
    }

    /// Sea in the 3x3 upper-left corner
    fn sea_corner() -> Raster<f64> {
        let mut ocean = grid(0.0);
        for row in 0..3 {
            for col in 0..3 {
                ocean.set(row, col, 1.0).unwrap();
            }
        }
        ocean
    }

    /// 30x30 grid with a 10x10 sea in the upper-left corner
    fn scenario_grids() -> (Raster<f64>, Raster<f64>) {
        let mut ocean = Raster::filled(30, 30, 0.0);
        ocean.set_transform(GeoTransform::north_up(0.0, 300.0, 10.0));
        for row in 0..10 {
            for col in 0..10 {
                ocean.set(row, col, 1.0).unwrap();
            }
        }
        let population = ocean.like(0.0);
        (ocean, population)
    }

    #[test]
    fn test_settlement_scenario() {
        let cfg = config();
        let kernels = DriverKernels::from_config(&cfg).unwrap();
        let (ocean, mut population) = scenario_grids();
        // Two cells inland from the sea edge along row 4
        population.set(4, 11, 15.0).unwrap();
        population.set(25, 25, 3.0).unwrap();

        let layers =
            coastal_influence(&LocalEngine::default(), &ocean, &population, &kernels, &cfg).unwrap();

        assert_eq!(count_true(&layers.settlements), 1);
        assert_eq!(layers.settlements.get(4, 11).unwrap(), 1.0);
        assert_relative_eq!(layers.distance_to_ocean.get(4, 11).unwrap(), 20.0);

        // Every sea cell lies within 80 km of the settlement
        assert_eq!(count_true(&layers.navigable_coast), 100);

        let d: f64 = 20.0;
        assert_relative_eq!(layers.influence.get(4, 11).unwrap(), 10.0 * (-0.0003 * d).exp());
        assert_relative_eq!(layers.influence.get(4, 11).unwrap(), decay(d, &cfg));

        let far = 800.0_f64.sqrt() * 10.0;
        assert_relative_eq!(
            layers.influence.get(29, 29).unwrap(),
            10.0 * (-0.0003 * far).exp(),
            epsilon = 1e-9
        );

        for row in 0..10 {
            for col in 0..10 {
                assert!(layers.influence.get(row, col).unwrap().is_nan());
            }
        }
    }

    #[test]
    fn test_masked_density_counts_as_zero() {
        let cfg = config();
        let kernels = DriverKernels::from_config(&cfg).unwrap();
        let population = grid(f64::NAN);

        let layers =
            coastal_influence(&LocalEngine::default(), &sea_corner(), &population, &kernels, &cfg)
                .unwrap();
        assert_eq!(count_true(&layers.settlements), 0);
        assert!(layers.influence.is_fully_masked());
        assert_eq!(count_true(&layers.navigable_coast), 0);
    }

    #[test]
    fn test_inland_settlement_is_ignored() {
        let cfg = DriverConfig {
            settlement_distance: 30.0,
            ..config()
        };
        let kernels = DriverKernels::from_config(&cfg).unwrap();
        let mut population = grid(0.0);
        population.set(9, 9, 500.0).unwrap();

        let layers =
            coastal_influence(&LocalEngine::default(), &sea_corner(), &population, &kernels, &cfg)
                .unwrap();
        assert!(layers.distance_to_ocean.get(9, 9).unwrap().is_nan());
        assert_eq!(count_true(&layers.settlements), 0);
    }

    #[test]
    fn test_navigation_distance_limits_coast() {
        let cfg = DriverConfig {
            navigation_distance: 25.0,
            ..config()
        };
        let kernels = DriverKernels::from_config(&cfg).unwrap();
        let mut settlements = grid(0.0);
        settlements.set(1, 4, 1.0).unwrap();

        let coast =
            navigable_coast(&LocalEngine::default(), &sea_corner(), &settlements, &kernels, &cfg)
                .unwrap();
        // Column 2 is 20 m away, column 1 is 30 m away
        assert_eq!(coast.get(1, 2).unwrap(), 1.0);
        assert_eq!(coast.get(1, 1).unwrap(), 0.0);
        assert_eq!(coast.get(0, 2).unwrap(), 1.0);
    }

    #[test]
    fn test_cumulative_cost_navigation() {
        let cfg = DriverConfig {
            navigation_distance: 23.0,
            navigation_metric: NavigationMetric::CumulativeCost,
            ..config()
        };
        let kernels = DriverKernels::from_config(&cfg).unwrap();
        let mut settlements = grid(0.0);
        settlements.set(1, 4, 1.0).unwrap();

        let coast =
            navigable_coast(&LocalEngine::default(), &sea_corner(), &settlements, &kernels, &cfg)
                .unwrap();
        assert_eq!(coast.get(1, 2).unwrap(), 1.0);
        assert_eq!(coast.get(1, 1).unwrap(), 0.0);
        // Straight-line distance is 22.4 m, the 8-connected path 24.1 m
        assert_eq!(coast.get(0, 2).unwrap(), 0.0);
    }
}
