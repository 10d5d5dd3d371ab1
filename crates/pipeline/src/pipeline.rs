//! Orchestration of one driver run
//!
//! [`WaterDriver::calc`] evaluates every stage for one task date and returns
//! all layers; [`WaterDriver::run`] additionally hands the quantized driver
//! to an export sink. Nothing is exported when any stage fails.

use chrono::NaiveDate;
use tracing::{debug, info};
use waterdriver_algorithms::algebra::mask_nodata;
use waterdriver_algorithms::resample::Resampling;
use waterdriver_core::raster::Raster;
use waterdriver_core::vector::FeatureCollection;
use waterdriver_core::Error;

use crate::catalog::{self, InputCatalog};
use crate::coastal::{coastal_influence, CoastalLayers};
use crate::composite::{composite, water_presence_mask};
use crate::config::{DriverConfig, DriverKernels};
use crate::engine::{LocalEngine, RasterEngine};
use crate::error::{PipelineError, Result};
use crate::inland::{extract_inland_waterways, inland_influence, InlandWaterways};
use crate::ocean::build_ocean_mask;
use crate::sink::ExportSink;
use crate::temporal::TemporalSeries;

/// Destination of the exported driver
pub const WATER_DRIVER_PRODUCT: &str = "driver/water";
/// Band name of the exported driver
pub const WATER_DRIVER_BAND: &str = "hii_water_driver";

/// Inputs of one run, as loaded by a collaborator
#[derive(Debug, Clone, Default)]
pub struct DriverInputs {
    /// Population density snapshots
    pub population_density: Option<TemporalSeries>,
    /// Surface-water occurrence, percent
    pub surface_water: Option<Raster<f64>>,
    /// Land/ocean raster, ocean 0 and land 1
    pub ocean: Option<Raster<f64>>,
    /// Inland-sea polygons
    pub inland_sea: Option<FeatureCollection>,
    /// Optional output domain, 0 or masked outside
    pub watermask: Option<Raster<f64>>,
}

impl DriverInputs {
    fn is_present(&self, name: &str) -> bool {
        match name {
            catalog::POPULATION_DENSITY => self.population_density.is_some(),
            catalog::SURFACE_WATER => self.surface_water.is_some(),
            catalog::OCEAN => self.ocean.is_some(),
            catalog::INLAND_SEA => self.inland_sea.is_some(),
            catalog::WATERMASK => self.watermask.is_some(),
            _ => false,
        }
    }

    /// Fail with [`PipelineError::MissingInput`] listing every required
    /// input of `catalog` that was not supplied.
    pub fn check(&self, catalog: &InputCatalog) -> Result<()> {
        let missing = catalog.missing(|name| self.is_present(name));
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::MissingInput(missing.join(", ")))
        }
    }
}

/// Every layer of a finished run
#[derive(Debug, Clone)]
pub struct DriverLayers {
    pub ocean_mask: Raster<f64>,
    /// Population density for the task date at working scale
    pub population: Raster<f64>,
    pub coastal: CoastalLayers,
    pub inland: InlandWaterways,
    pub inland_influence: Raster<f64>,
    pub water_presence: Raster<f64>,
    /// Quantized driver, nodata `i32::MIN`
    pub driver: Raster<i32>,
}

/// The water-proximity driver over an evaluation engine
pub struct WaterDriver<E: RasterEngine> {
    engine: E,
    config: DriverConfig,
    kernels: DriverKernels,
    catalog: InputCatalog,
}

impl WaterDriver<LocalEngine> {
    /// Driver evaluated in memory with the configured processing mode
    pub fn local(config: DriverConfig) -> Result<Self> {
        let engine = LocalEngine::from_config(&config.processing);
        Self::new(engine, config)
    }
}

impl<E: RasterEngine> WaterDriver<E> {
    /// Validate `config` and build the run's kernels.
    pub fn new(engine: E, config: DriverConfig) -> Result<Self> {
        config.validate()?;
        let kernels = DriverKernels::from_config(&config)?;
        Ok(Self {
            engine,
            config,
            kernels,
            catalog: InputCatalog::water_driver(),
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn kernels(&self) -> &DriverKernels {
        &self.kernels
    }

    pub fn catalog(&self) -> &InputCatalog {
        &self.catalog
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Evaluate every stage for `date`.
    pub fn calc(&self, inputs: &DriverInputs, date: NaiveDate) -> Result<DriverLayers> {
        inputs.check(&self.catalog)?;
        let (Some(series), Some(surface_water), Some(ocean), Some(inland_sea)) = (
            inputs.population_density.as_ref(),
            inputs.surface_water.as_ref(),
            inputs.ocean.as_ref(),
            inputs.inland_sea.as_ref(),
        ) else {
            return Err(PipelineError::MissingInput("required driver inputs".to_string()));
        };

        info!(
            %date,
            working_scale = self.config.working_scale,
            fine_scale = self.config.fine_scale,
            "running water driver"
        );

        let ocean = self.normalized("ocean", ocean)?;
        let ocean_mask = build_ocean_mask(&self.engine, &ocean, inland_sea, &self.config)?;

        let population = self.normalized(series.layer(), &series.resolve(date)?)?;
        let population = self
            .engine
            .resample_to(&population, &ocean_mask, Resampling::Mean)?;
        debug!(valid_cells = population.valid_count(), "population density at working scale");

        let coastal = coastal_influence(
            &self.engine,
            &ocean_mask,
            &population,
            &self.kernels,
            &self.config,
        )?;

        let surface_water = self.normalized("surface_water", surface_water)?;
        let surface_water =
            self.engine
                .resample(&surface_water, self.config.fine_scale, Resampling::Mean)?;
        let inland = extract_inland_waterways(
            &self.engine,
            &surface_water,
            &ocean_mask,
            &self.kernels,
            &self.config,
        )?;
        let inland_influence = inland_influence(
            &self.engine,
            &inland.waterways,
            &ocean_mask,
            &self.kernels,
            &self.config,
        )?;

        let water_presence = water_presence_mask(&self.engine, &ocean_mask, &inland.presence)?;
        let domain = match inputs.watermask.as_ref() {
            Some(mask) => {
                let mask = self.normalized("watermask", mask)?;
                Some(self.engine.resample_to(&mask, &ocean_mask, Resampling::Nearest)?)
            }
            None => None,
        };

        let driver = composite(
            &coastal.influence,
            &inland_influence,
            &water_presence,
            domain.as_ref(),
        )?;

        Ok(DriverLayers {
            ocean_mask,
            population,
            coastal,
            inland,
            inland_influence,
            water_presence,
            driver,
        })
    }

    /// Evaluate for `date` and export the driver under
    /// [`WATER_DRIVER_PRODUCT`].
    pub fn run<S: ExportSink + ?Sized>(
        &self,
        inputs: &DriverInputs,
        date: NaiveDate,
        sink: &mut S,
    ) -> Result<DriverLayers> {
        let layers = self.calc(inputs, date)?;
        sink.export(&layers.driver, WATER_DRIVER_PRODUCT)?;
        info!(product = WATER_DRIVER_PRODUCT, band = WATER_DRIVER_BAND, %date, "water driver done");
        Ok(layers)
    }

    /// Nodata to NaN, and a CRS check against the working CRS.
    fn normalized(&self, layer: &str, raster: &Raster<f64>) -> Result<Raster<f64>> {
        if let Some(crs) = raster.crs() {
            if crs.is_geographic() {
                return Err(Error::InvalidParameter {
                    name: "crs",
                    value: format!("{} ({})", crs.identifier(), layer),
                    reason: "scales are in meters; inputs must use a projected CRS".to_string(),
                }
                .into());
            }
            if let Some(expected) = self.config.working_crs() {
                if !expected.is_equivalent(crs) {
                    return Err(Error::CrsMismatch(expected.identifier(), crs.identifier()).into());
                }
            }
        }
        Ok(mask_nodata(raster)?)
    }
}
