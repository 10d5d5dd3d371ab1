//! Structuring element definitions for morphological operations

use waterdriver_core::raster::Kernel;
use waterdriver_core::{Error, Result};

/// Shape of a structuring element, in cells
#[derive(Debug, Clone, PartialEq)]
pub enum StructuringElement {
    /// Square element of given radius (side = 2*radius + 1)
    Square(usize),
    /// Disk element of given radius
    Disk(usize),
    /// Explicit (dr, dc) footprint, usually derived from a metric kernel
    Footprint(Vec<(isize, isize)>),
}

impl Default for StructuringElement {
    fn default() -> Self {
        StructuringElement::Disk(1)
    }
}

impl StructuringElement {
    /// Footprint of a metric kernel evaluated at `scale` meters per cell
    pub fn from_kernel(kernel: &Kernel, scale: f64) -> Result<Self> {
        let offsets = kernel.offsets(scale)?;
        Ok(StructuringElement::Footprint(
            offsets.into_iter().map(|o| (o.dr, o.dc)).collect(),
        ))
    }

    /// Validate the structuring element
    pub fn validate(&self) -> Result<()> {
        match self {
            StructuringElement::Square(r) | StructuringElement::Disk(r) => {
                if *r == 0 {
                    return Err(Error::InvalidParameter {
                        name: "radius",
                        value: "0".to_string(),
                        reason: "structuring element radius must be at least 1".to_string(),
                    });
                }
                Ok(())
            }
            StructuringElement::Footprint(offsets) => {
                if offsets.is_empty() {
                    return Err(Error::InvalidParameter {
                        name: "footprint",
                        value: "empty".to_string(),
                        reason: "footprint must contain at least one cell".to_string(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Largest row/column distance from the center
    pub fn radius(&self) -> usize {
        match self {
            StructuringElement::Square(r) | StructuringElement::Disk(r) => *r,
            StructuringElement::Footprint(offsets) => offsets
                .iter()
                .map(|&(dr, dc)| dr.unsigned_abs().max(dc.unsigned_abs()))
                .max()
                .unwrap_or(0),
        }
    }

    /// (dr, dc) offsets relative to center for all active cells
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        match self {
            StructuringElement::Square(r) => {
                let r = *r as isize;
                (-r..=r).flat_map(|dr| (-r..=r).map(move |dc| (dr, dc))).collect()
            }
            StructuringElement::Disk(r) => {
                let r = *r as isize;
                (-r..=r)
                    .flat_map(|dr| (-r..=r).map(move |dc| (dr, dc)))
                    .filter(|&(dr, dc)| dr * dr + dc * dc <= r * r)
                    .collect()
            }
            StructuringElement::Footprint(offsets) => offsets.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_offsets() {
        let offsets = StructuringElement::Square(1).offsets();
        assert_eq!(offsets.len(), 9);
        assert!(offsets.contains(&(-1, -1)));
    }

    #[test]
    fn test_disk_offsets() {
        let offsets = StructuringElement::Disk(1).offsets();
        assert_eq!(offsets.len(), 5);
        assert!(!offsets.contains(&(1, 1)));
        assert_eq!(StructuringElement::Disk(2).offsets().len(), 13);
    }

    #[test]
    fn test_from_kernel_depends_on_scale() {
        let kernel = Kernel::circle("river_width", 30.0);
        let fine = StructuringElement::from_kernel(&kernel, 10.0).unwrap();
        assert_eq!(fine.radius(), 3);
        assert_eq!(fine.offsets().len(), StructuringElement::Disk(3).offsets().len());

        let coarse = StructuringElement::from_kernel(&kernel, 30.0).unwrap();
        assert_eq!(coarse.radius(), 1);
    }

    #[test]
    fn test_validate() {
        assert!(StructuringElement::Square(0).validate().is_err());
        assert!(StructuringElement::Disk(0).validate().is_err());
        assert!(StructuringElement::Footprint(Vec::new()).validate().is_err());
        assert!(StructuringElement::default().validate().is_ok());
    }
}
