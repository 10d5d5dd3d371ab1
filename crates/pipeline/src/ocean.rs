//! Ocean mask
//!
//! Fuses the land/ocean raster with rasterized inland-sea polygons. Inland
//! seas are large enough to behave like ocean for navigation but are
//! missing from the ocean raster.

use tracing::{debug, info};
use waterdriver_algorithms::algebra::{count_true, logical_or, threshold, unmask, Comparison};
use waterdriver_algorithms::rasterize::RasterizeReducer;
use waterdriver_algorithms::resample::Resampling;
use waterdriver_core::raster::Raster;
use waterdriver_core::vector::FeatureCollection;

use crate::config::DriverConfig;
use crate::engine::RasterEngine;
use crate::error::Result;

/// Binary ocean mask at the working scale: 1 ocean or inland sea, 0 land.
///
/// `ocean_raster` encodes ocean as 0 and land as 1; masked cells count as
/// land. A cell belongs to an inland sea when the maximum of
/// `config.inland_sea_attribute` over the polygons covering its center is
/// exactly 1. The result has no masked cells and lies on the grid of
/// `ocean_raster` resampled to `config.working_scale`.
pub fn build_ocean_mask<E: RasterEngine + ?Sized>(
    engine: &E,
    ocean_raster: &Raster<f64>,
    inland_sea: &FeatureCollection,
    config: &DriverConfig,
) -> Result<Raster<f64>> {
    let ocean = engine.resample(ocean_raster, config.working_scale, Resampling::Nearest)?;
    let is_ocean = threshold(&unmask(&ocean, 1.0)?, Comparison::Eq, 0.0)?;

    let seas = engine.rasterize(
        inland_sea,
        &config.inland_sea_attribute,
        RasterizeReducer::Max,
        &ocean,
    )?;
    let is_sea = unmask(&threshold(&seas, Comparison::Eq, 1.0)?, 0.0)?;
    debug!(features = inland_sea.len(), sea_cells = count_true(&is_sea), "rasterized inland seas");

    let mask = logical_or(&is_ocean, &is_sea)?;
    info!(
        rows = mask.rows(),
        cols = mask.cols(),
        scale = mask.scale(),
        ocean_cells = count_true(&mask),
        "built ocean mask"
    );
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalEngine;
    use geo_types::{polygon, Geometry};
    use waterdriver_core::vector::{AttributeValue, Feature};
    use waterdriver_core::GeoTransform;

    fn ocean_raster() -> Raster<f64> {
        // 6x6 at 100 m: left two columns ocean, one masked cell
        let mut r = Raster::filled(6, 6, 1.0);
        r.set_transform(GeoTransform::north_up(0.0, 600.0, 100.0));
        for row in 0..6 {
            r.set(row, 0, 0.0).unwrap();
            r.set(row, 1, 0.0).unwrap();
        }
        r.set(5, 5, f64::NAN).unwrap();
        r
    }

    fn sea(id: i64) -> Feature {
        let poly = polygon![
            (x: 400.0, y: 600.0),
            (x: 600.0, y: 600.0),
            (x: 600.0, y: 400.0),
            (x: 400.0, y: 400.0),
            (x: 400.0, y: 600.0),
        ];
        Feature::new(Geometry::Polygon(poly)).with_property("glwd_id", AttributeValue::Int(id))
    }

    fn config() -> DriverConfig {
        DriverConfig {
            working_scale: 100.0,
            fine_scale: 100.0,
            min_navigable_width: 100.0,
            ..DriverConfig::default()
        }
    }

    #[test]
    fn test_ocean_and_inland_sea() {
        let features: FeatureCollection = vec![sea(1)].into_iter().collect();
        let mask = build_ocean_mask(&LocalEngine::default(), &ocean_raster(), &features, &config())
            .unwrap();

        assert_eq!(mask.valid_count(), 36);
        assert_eq!(mask.get(3, 0).unwrap(), 1.0);
        assert_eq!(mask.get(0, 5).unwrap(), 1.0);
        assert_eq!(mask.get(3, 3).unwrap(), 0.0);
        assert_eq!(mask.get(5, 5).unwrap(), 0.0);
        assert_eq!(count_true(&mask), 12 + 4);
    }

    #[test]
    fn test_other_attribute_values_are_not_sea() {
        let features: FeatureCollection = vec![sea(2)].into_iter().collect();
        let mask = build_ocean_mask(&LocalEngine::default(), &ocean_raster(), &features, &config())
            .unwrap();
        assert_eq!(mask.get(0, 5).unwrap(), 0.0);
    }

    #[test]
    fn test_resampled_to_working_scale() {
        let cfg = DriverConfig {
            working_scale: 200.0,
            ..config()
        };
        let mask = build_ocean_mask(
            &LocalEngine::default(),
            &ocean_raster(),
            &FeatureCollection::new(),
            &cfg,
        )
        .unwrap();
        assert_eq!(mask.shape(), (3, 3));
        assert_eq!(mask.scale(), 200.0);
    }
}
