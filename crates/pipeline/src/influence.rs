//! Distance-decayed influence shared by the coastal and inland stages

use waterdriver_algorithms::algebra::{band_math, update_mask};
use waterdriver_core::raster::Raster;

use crate::config::{DriverConfig, DriverKernels};
use crate::engine::RasterEngine;
use crate::error::Result;

/// Influence at `distance` meters: `scale * exp(decay * distance)`
pub fn decay(distance: f64, config: &DriverConfig) -> f64 {
    (config.decay_constant * distance).exp() * config.indirect_influence_scale
}

/// Decayed influence of the non-zero cells of `sources`.
///
/// Defined within the `indirect` kernel radius of a source and inside
/// `domain` (non-zero cells); masked elsewhere.
pub fn decayed_influence<E: RasterEngine + ?Sized>(
    engine: &E,
    sources: &Raster<f64>,
    domain: &Raster<f64>,
    kernels: &DriverKernels,
    config: &DriverConfig,
) -> Result<Raster<f64>> {
    let distance = engine.distance(sources, &kernels.indirect)?;
    let influence = band_math(&distance, |d| decay(d, config))?;
    Ok(update_mask(&influence, domain)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalEngine;
    use approx::assert_relative_eq;
    use waterdriver_core::GeoTransform;

    #[test]
    fn test_decay_at_zero_is_scale() {
        let config = DriverConfig::default();
        assert_relative_eq!(decay(0.0, &config), config.indirect_influence_scale);
    }

    #[test]
    fn test_decay_is_monotonic() {
        let config = DriverConfig::default();
        let mut previous = decay(0.0, &config);
        for step in 1..=150 {
            let current = decay(step as f64 * 100.0, &config);
            assert!(current < previous);
            assert!(current > 0.0);
            previous = current;
        }
    }

    #[test]
    fn test_decayed_influence_respects_domain_and_bound() {
        let config = DriverConfig {
            working_scale: 1000.0,
            influence_distance: 3000.0,
            ..DriverConfig::default()
        };
        let kernels = DriverKernels::from_config(&config).unwrap();

        let mut sources = Raster::filled(1, 6, 0.0);
        sources.set_transform(GeoTransform::north_up(0.0, 1000.0, 1000.0));
        sources.set(0, 0, 1.0).unwrap();
        let mut domain = sources.like(1.0);
        domain.set(0, 1, 0.0).unwrap();

        let out = decayed_influence(&LocalEngine::default(), &sources, &domain, &kernels, &config)
            .unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 4.0);
        assert!(out.get(0, 1).unwrap().is_nan());
        assert_relative_eq!(out.get(0, 2).unwrap(), decay(2000.0, &config));
        assert_relative_eq!(out.get(0, 3).unwrap(), decay(3000.0, &config));
        assert!(out.get(0, 4).unwrap().is_nan());
    }
}
