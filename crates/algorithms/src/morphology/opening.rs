//! Morphological opening (erosion followed by dilation)
//!
//! Removes foreground features narrower than the structuring element while
//! keeping wider ones at their original extent. Used as a width filter on
//! water masks.

use waterdriver_core::raster::Raster;
use waterdriver_core::Result;

use super::dilate::dilate;
use super::element::StructuringElement;
use super::erode::erode;

/// Perform morphological opening on a raster
///
/// Opening = erode then dilate with the same element. Because both passes
/// skip out-of-grid and masked neighbours there is no NaN border, and
/// opening an already opened binary mask returns it unchanged.
pub fn opening(raster: &Raster<f64>, element: &StructuringElement) -> Result<Raster<f64>> {
    let eroded = erode(raster, element)?;
    dilate(&eroded, element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use waterdriver_core::raster::Kernel;
    use waterdriver_core::GeoTransform;

    fn make_raster(rows: usize, cols: usize, value: f64, scale: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::north_up(0.0, rows as f64 * scale, scale));
        r
    }

    #[test]
    fn test_opening_removes_single_pixel() {
        let mut raster = make_raster(11, 11, 0.0, 1.0);
        raster.set(5, 5, 1.0).unwrap();

        let result = opening(&raster, &StructuringElement::Square(1)).unwrap();
        assert_eq!(result.get(5, 5).unwrap(), 0.0);
    }

    #[test]
    fn test_opening_preserves_wide_block() {
        let mut raster = make_raster(11, 11, 0.0, 1.0);
        for r in 3..8 {
            for c in 3..8 {
                raster.set(r, c, 1.0).unwrap();
            }
        }

        let result = opening(&raster, &StructuringElement::Square(1)).unwrap();
        for r in 3..8 {
            for c in 3..8 {
                assert_eq!(result.get(r, c).unwrap(), 1.0, "cell ({}, {})", r, c);
            }
        }
        assert_eq!(result.get(2, 5).unwrap(), 0.0);
    }

    #[test]
    fn test_opening_removes_narrow_channel() {
        // One 10 m column of water, element radius 30 m at 10 m cells
        let mut raster = make_raster(20, 20, 0.0, 10.0);
        for r in 0..20 {
            raster.set(r, 10, 1.0).unwrap();
        }
        let element =
            StructuringElement::from_kernel(&Kernel::circle("river_width", 30.0), 10.0).unwrap();

        let result = opening(&raster, &element).unwrap();
        assert!(result.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_opening_is_idempotent() {
        let mut raster = make_raster(16, 16, 0.0, 1.0);
        // Irregular shape touching the border plus some noise
        for r in 0..6 {
            for c in 0..9 {
                raster.set(r, c, 1.0).unwrap();
            }
        }
        for r in 9..16 {
            raster.set(r, 12, 1.0).unwrap();
            raster.set(r, 13, 1.0).unwrap();
            raster.set(r, 14, 1.0).unwrap();
        }
        raster.set(12, 3, 1.0).unwrap();
        raster.set(7, 7, 1.0).unwrap();

        for element in [StructuringElement::Square(1), StructuringElement::Disk(1)] {
            let once = opening(&raster, &element).unwrap();
            let twice = opening(&once, &element).unwrap();
            assert_eq!(once.data(), twice.data());
        }
    }
}
