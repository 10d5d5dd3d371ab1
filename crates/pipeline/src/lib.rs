//! # Waterdriver Pipeline
//!
//! The water-proximity human-influence driver: per cell, the indirect
//! pressure of being near navigable coast or navigable inland water.
//!
//! Stages, leaf to root:
//! - [`temporal`]: population density for the task date
//! - [`ocean`]: ocean mask from the land/ocean raster and inland seas
//! - [`coastal`]: coastal settlements, navigable coast, coastal influence
//! - [`inland`]: width- and connectivity-filtered inland waterways and their
//!   influence
//! - [`composite`]: maximum of both fields, water masking, quantization
//!
//! Stages depend only on the [`RasterEngine`] evaluation service and, for
//! the final export, an [`ExportSink`].
//!
//! # Example
//!
//! ```ignore
//! use waterdriver_pipeline::{DriverConfig, MemorySink, WaterDriver};
//!
//! let driver = WaterDriver::local(DriverConfig::default())?;
//! let mut sink = MemorySink::new();
//! driver.run(&inputs, date, &mut sink)?;
//! ```

pub mod catalog;
pub mod coastal;
pub mod composite;
pub mod config;
pub mod engine;
pub mod error;
pub mod influence;
pub mod inland;
pub mod ocean;
pub mod pipeline;
pub mod sink;
pub mod temporal;

pub use catalog::{Freshness, InputCatalog, InputKind, InputSpec};
pub use config::{DriverConfig, DriverKernels, NavigationMetric, ProcessingConfig};
pub use engine::{LocalEngine, NeighborhoodReducer, RasterEngine};
pub use error::{PipelineError, Result};
pub use pipeline::{DriverInputs, DriverLayers, WaterDriver, WATER_DRIVER_BAND, WATER_DRIVER_PRODUCT};
pub use sink::{ExportSink, GeoTiffSink, MemorySink};
pub use temporal::{EdgePolicy, Resolution, TemporalSeries};
