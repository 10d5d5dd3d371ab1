//! Input catalog
//!
//! Describes what the driver reads: a logical name, the kind of dataset,
//! how fresh it must be and where a store keeps it. Freshness and paths are
//! information for the collaborators that fetch inputs; the pipeline only
//! checks that every required input was supplied.

use std::fmt;

/// Kind of dataset behind an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Image,
    ImageCollection,
    FeatureCollection,
}

/// How old an input may be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// At most this many days older than the task date
    MaxAgeDays(u32),
    /// Never changes
    Static,
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::MaxAgeDays(days) => write!(f, "{} day(s)", days),
            Freshness::Static => write!(f, "static"),
        }
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub name: &'static str,
    pub kind: InputKind,
    pub freshness: Freshness,
    pub path: &'static str,
    pub required: bool,
}

/// The inputs of one driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputCatalog {
    inputs: Vec<InputSpec>,
}

pub const POPULATION_DENSITY: &str = "population_density";
pub const SURFACE_WATER: &str = "gsw";
pub const INLAND_SEA: &str = "caspian_sea";
pub const OCEAN: &str = "ocean";
pub const WATERMASK: &str = "watermask";

impl InputCatalog {
    pub fn new(inputs: Vec<InputSpec>) -> Self {
        Self { inputs }
    }

    /// Inputs of the water driver
    pub fn water_driver() -> Self {
        Self::new(vec![
            InputSpec {
                name: POPULATION_DENSITY,
                kind: InputKind::ImageCollection,
                freshness: Freshness::MaxAgeDays(1),
                path: "misc/gpw_interpolated",
                required: true,
            },
            InputSpec {
                name: SURFACE_WATER,
                kind: InputKind::Image,
                freshness: Freshness::Static,
                path: "JRC/GSW1_2/GlobalSurfaceWater",
                required: true,
            },
            InputSpec {
                name: INLAND_SEA,
                kind: InputKind::FeatureCollection,
                freshness: Freshness::Static,
                path: "source/phys/caspian",
                required: true,
            },
            InputSpec {
                name: OCEAN,
                kind: InputKind::Image,
                freshness: Freshness::Static,
                path: "source/phys/ESACCI-LC-L4-WB-Ocean-Map-150m-P13Y-2000-v40",
                required: true,
            },
            InputSpec {
                name: WATERMASK,
                kind: InputKind::Image,
                freshness: Freshness::MaxAgeDays(30),
                path: "source/phys/watermask_jrc70_cciocean",
                required: false,
            },
        ])
    }

    pub fn get(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|spec| spec.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputSpec> {
        self.inputs.iter()
    }

    pub fn required(&self) -> impl Iterator<Item = &InputSpec> {
        self.inputs.iter().filter(|spec| spec.required)
    }

    /// Required inputs that `is_present` does not report as supplied
    pub fn missing<F>(&self, is_present: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> bool,
    {
        self.required()
            .filter(|spec| !is_present(spec.name))
            .map(|spec| spec.name)
            .collect()
    }
}

impl Default for InputCatalog {
    fn default() -> Self {
        Self::water_driver()
    }
}
