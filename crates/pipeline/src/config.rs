//! Driver configuration
//!
//! Every model constant of the water driver lives in [`DriverConfig`]. The
//! defaults are the published model values; a JSON file may override any
//! subset of them.

use serde::{Deserialize, Serialize};
use waterdriver_core::raster::Kernel;
use waterdriver_core::CRS;
use waterdriver_parallel::ProcessingMode;

use crate::error::{PipelineError, Result};

/// Transform used to find ocean cells near coastal settlements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationMetric {
    /// Bounded Euclidean distance
    #[default]
    Euclidean,
    /// Accumulated cost over a uniform surface (8-connected)
    CumulativeCost,
}

/// Threading and tiling of the local engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Dedicated pool size; `None` uses the global rayon pool
    pub threads: Option<usize>,
    /// Side of a square core tile, in cells
    pub tile_size: usize,
    /// Force single-threaded execution
    pub sequential: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            threads: None,
            tile_size: 512,
            sequential: false,
        }
    }
}

impl ProcessingConfig {
    pub fn mode(&self) -> ProcessingMode {
        ProcessingMode::from_threads(self.threads, self.sequential)
    }
}

/// Immutable parameters for one driver run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Scale of comparisons, thresholds and the output, in meters
    pub working_scale: f64,
    /// Scale of the surface-water width filter, in meters
    pub fine_scale: f64,
    /// Coarse scale of the navigable-coast transform, in meters
    pub navigation_scale: f64,
    /// Max distance from the ocean for a coastal settlement, in meters
    pub settlement_distance: f64,
    /// Minimum population density of a coastal settlement
    pub settlement_density_threshold: f64,
    /// Max distance from a settlement for navigable ocean, in meters
    pub navigation_distance: f64,
    pub navigation_metric: NavigationMetric,
    /// Surface-water occurrence (percent) above which a cell is water
    pub occurrence_threshold: f64,
    /// Width below which a water body is not navigable, in meters
    pub min_navigable_width: f64,
    /// Minimum connected cells of a navigable inland network
    pub connected_pixel_minimum: usize,
    /// Bound of the influence distance transform, in meters
    pub influence_distance: f64,
    /// Exponential decay per meter, negative
    pub decay_constant: f64,
    /// Influence at distance zero
    pub indirect_influence_scale: f64,
    /// Attribute of the inland-sea features that marks an inland sea
    pub inland_sea_attribute: String,
    /// EPSG code of the working CRS, if inputs must be checked against it
    pub working_epsg: Option<u32>,
    pub processing: ProcessingConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            working_scale: 300.0,
            fine_scale: 30.0,
            navigation_scale: 1000.0,
            settlement_distance: 4000.0,
            settlement_density_threshold: 10.0,
            navigation_distance: 80_000.0,
            navigation_metric: NavigationMetric::Euclidean,
            occurrence_threshold: 40.0,
            min_navigable_width: 30.0,
            connected_pixel_minimum: 1024,
            influence_distance: 15_000.0,
            decay_constant: -0.0003,
            indirect_influence_scale: 4.0,
            inland_sea_attribute: "glwd_id".to_string(),
            working_epsg: None,
            processing: ProcessingConfig::default(),
        }
    }
}

impl DriverConfig {
    /// Check every field, returning the first configuration error.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("working_scale", self.working_scale),
            ("fine_scale", self.fine_scale),
            ("navigation_scale", self.navigation_scale),
            ("settlement_distance", self.settlement_distance),
            ("navigation_distance", self.navigation_distance),
            ("min_navigable_width", self.min_navigable_width),
            ("influence_distance", self.influence_distance),
            ("indirect_influence_scale", self.indirect_influence_scale),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(field, format!("must be positive, got {}", value)));
            }
        }

        if !self.decay_constant.is_finite() || self.decay_constant >= 0.0 {
            return Err(invalid(
                "decay_constant",
                format!("must be negative, got {}", self.decay_constant),
            ));
        }
        if !(0.0..=100.0).contains(&self.occurrence_threshold) {
            return Err(invalid(
                "occurrence_threshold",
                format!("must be a percentage, got {}", self.occurrence_threshold),
            ));
        }
        if !self.settlement_density_threshold.is_finite() {
            return Err(invalid("settlement_density_threshold", "must be finite".to_string()));
        }
        if self.connected_pixel_minimum == 0 {
            return Err(invalid("connected_pixel_minimum", "must be at least 1".to_string()));
        }
        if self.fine_scale > self.working_scale {
            return Err(invalid(
                "fine_scale",
                format!("{} is coarser than working_scale {}", self.fine_scale, self.working_scale),
            ));
        }
        if self.min_navigable_width < self.fine_scale {
            return Err(invalid(
                "min_navigable_width",
                format!("{} m is below one cell at fine_scale {}", self.min_navigable_width, self.fine_scale),
            ));
        }
        if self.inland_sea_attribute.trim().is_empty() {
            return Err(invalid("inland_sea_attribute", "must not be empty".to_string()));
        }
        if self.processing.tile_size == 0 {
            return Err(invalid("processing.tile_size", "must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Working CRS, if one is configured
    pub fn working_crs(&self) -> Option<CRS> {
        self.working_epsg.map(CRS::from_epsg)
    }

    pub fn mode(&self) -> ProcessingMode {
        self.processing.mode()
    }
}

fn invalid(field: &'static str, reason: String) -> PipelineError {
    PipelineError::InvalidConfig { field, reason }
}

/// The kernels of a run, built once from the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DriverKernels {
    pub coastal_settlement: Kernel,
    pub coastal_navigation: Kernel,
    pub indirect: Kernel,
    pub river_width: Kernel,
}

impl DriverKernels {
    pub fn from_config(config: &DriverConfig) -> Result<Self> {
        let kernels = Self {
            coastal_settlement: Kernel::euclidean("coastal_settlements", config.settlement_distance),
            coastal_navigation: Kernel::euclidean("coastal_navigation", config.navigation_distance),
            indirect: Kernel::euclidean("indirect", config.influence_distance),
            river_width: Kernel::circle("river_width", config.min_navigable_width),
        };
        for kernel in kernels.iter() {
            kernel.validate()?;
        }
        Ok(kernels)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Kernel> {
        [
            &self.coastal_settlement,
            &self.coastal_navigation,
            &self.indirect,
            &self.river_width,
        ]
        .into_iter()
    }
}
