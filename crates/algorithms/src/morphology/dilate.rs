//! Morphological dilation (maximum filter)

use waterdriver_core::raster::Raster;
use waterdriver_core::Result;

use super::element::StructuringElement;
use super::{reduce_neighborhood, Extreme};

/// Perform morphological dilation on a raster
///
/// Each output cell is the maximum over the in-grid, unmasked cells of the
/// structuring element centered on it. Masked centers stay masked.
pub fn dilate(raster: &Raster<f64>, element: &StructuringElement) -> Result<Raster<f64>> {
    reduce_neighborhood(raster, element, Extreme::Max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use waterdriver_core::GeoTransform;

    fn make_raster(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_dilate_picks_maximum() {
        let mut raster = make_raster(7, 7, 1.0);
        raster.set(3, 4, 50.0).unwrap();

        let result = dilate(&raster, &StructuringElement::Square(1)).unwrap();
        assert_eq!(result.get(3, 3).unwrap(), 50.0);
        assert_eq!(result.get(3, 1).unwrap(), 1.0);
    }

    #[test]
    fn test_dilate_corner_cell() {
        let mut raster = make_raster(5, 5, 0.0);
        raster.set(0, 1, 1.0).unwrap();

        let result = dilate(&raster, &StructuringElement::Disk(1)).unwrap();
        assert_eq!(result.get(0, 0).unwrap(), 1.0);
        assert_eq!(result.get(1, 1).unwrap(), 1.0);
        assert_eq!(result.get(1, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_dilate_keeps_masked_center() {
        let mut raster = make_raster(5, 5, 1.0);
        raster.set(2, 2, f64::NAN).unwrap();

        let result = dilate(&raster, &StructuringElement::Square(2)).unwrap();
        assert!(result.get(2, 2).unwrap().is_nan());
        assert_eq!(result.get(0, 0).unwrap(), 1.0);
    }
}
