//! Named neighborhood kernels with radii in meters
//!
//! A kernel's radius is a model constant in meters. Its footprint in cells
//! depends on the scale of the raster it runs on, so offsets are always
//! produced for an explicit scale.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Shape of a kernel footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelShape {
    /// Boolean disk: every cell within the radius has equal weight
    Circle,
    /// Disk whose cells carry their Euclidean distance to the center
    Euclidean,
}

/// A single kernel cell relative to the center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelOffset {
    pub dr: isize,
    pub dc: isize,
    /// Distance from the center in meters
    pub distance: f64,
}

/// A named neighborhood shape with a radius in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kernel {
    name: String,
    shape: KernelShape,
    radius: f64,
}

impl Kernel {
    /// Boolean disk kernel of `radius` meters
    pub fn circle(name: impl Into<String>, radius: f64) -> Self {
        Self {
            name: name.into(),
            shape: KernelShape::Circle,
            radius,
        }
    }

    /// Distance-carrying disk kernel of `radius` meters
    pub fn euclidean(name: impl Into<String>, radius: f64) -> Self {
        Self {
            name: name.into(),
            shape: KernelShape::Euclidean,
            radius,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> KernelShape {
        self.shape
    }

    /// Radius in meters
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Reject non-positive or non-finite radii
    pub fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "kernel radius",
                value: format!("{} ({})", self.radius, self.name),
                reason: "kernel radius must be a positive number of meters".to_string(),
            });
        }
        Ok(())
    }

    /// Radius expressed in cells at `scale` meters per cell
    pub fn radius_cells(&self, scale: f64) -> f64 {
        self.radius / scale
    }

    /// Number of whole cells the kernel reaches from its center at `scale`.
    pub fn reach_cells(&self, scale: f64) -> usize {
        self.radius_cells(scale).floor().max(0.0) as usize
    }

    /// All offsets within the radius at `scale`, center included.
    pub fn offsets(&self, scale: f64) -> Result<Vec<KernelOffset>> {
        self.validate()?;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "scale",
                value: scale.to_string(),
                reason: "scale must be a positive number of meters".to_string(),
            });
        }

        let r = self.radius_cells(scale);
        let reach = self.reach_cells(scale) as isize;
        let r2 = r * r + 1e-9;
        let mut offsets = Vec::new();

        for dr in -reach..=reach {
            for dc in -reach..=reach {
                let d2 = (dr * dr + dc * dc) as f64;
                if d2 <= r2 {
                    offsets.push(KernelOffset {
                        dr,
                        dc,
                        distance: d2.sqrt() * scale,
                    });
                }
            }
        }

        Ok(offsets)
    }
}
