//! Polygon features to raster
//!
//! Burns a numeric attribute of polygon features onto a template grid. A
//! cell is covered by a feature when its center lies inside the polygon.
//! Where features overlap, the reducer decides which value wins.

use geo::{BoundingRect, Contains, Geometry, Point};
use waterdriver_core::raster::Raster;
use waterdriver_core::vector::FeatureCollection;
use waterdriver_core::Result;

/// How values of overlapping features are combined in one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterizeReducer {
    #[default]
    Max,
    Min,
}

impl RasterizeReducer {
    fn combine(self, current: f64, value: f64) -> f64 {
        if current.is_nan() {
            return value;
        }
        match self {
            RasterizeReducer::Max => current.max(value),
            RasterizeReducer::Min => current.min(value),
        }
    }
}

/// Rasterize `attribute` of every polygon feature onto `template`'s grid.
///
/// Cells covered by no feature are masked. Features without geometry, with
/// non-areal geometry, or without a numeric value for `attribute` are
/// skipped. Feature coordinates must be in the template's CRS.
pub fn rasterize(
    features: &FeatureCollection,
    attribute: &str,
    reducer: RasterizeReducer,
    template: &Raster<f64>,
) -> Result<Raster<f64>> {
    let (rows, cols) = template.shape();
    let transform = *template.transform();
    let mut data = vec![f64::NAN; rows * cols];

    for feature in features.iter() {
        let Some(value) = feature.get_property(attribute).and_then(|v| v.as_f64()) else {
            continue;
        };
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        let covers: Box<dyn Fn(&Point<f64>) -> bool> = match geometry {
            Geometry::Polygon(p) => Box::new(move |pt| p.contains(pt)),
            Geometry::MultiPolygon(mp) => Box::new(move |pt| mp.contains(pt)),
            _ => continue,
        };
        let bbox = match geometry {
            Geometry::Polygon(p) => p.bounding_rect(),
            Geometry::MultiPolygon(mp) => mp.bounding_rect(),
            _ => None,
        };
        let Some(bbox) = bbox else {
            continue;
        };

        // Pixel window of the bounding box, clamped to the grid
        let (c0, r0) = transform.geo_to_pixel(bbox.min().x, bbox.max().y);
        let (c1, r1) = transform.geo_to_pixel(bbox.max().x, bbox.min().y);
        let Some((row_start, row_end)) = clamp_span(r0.min(r1), r0.max(r1), rows) else {
            continue;
        };
        let Some((col_start, col_end)) = clamp_span(c0.min(c1), c0.max(c1), cols) else {
            continue;
        };

        for row in row_start..row_end {
            for col in col_start..col_end {
                let (x, y) = transform.pixel_to_geo(col, row);
                if covers(&Point::new(x, y)) {
                    let idx = row * cols + col;
                    data[idx] = reducer.combine(data[idx], value);
                }
            }
        }
    }

    template.with_data(data, Some(f64::NAN))
}

fn clamp_span(lo: f64, hi: f64, len: usize) -> Option<(usize, usize)> {
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let start = lo.floor().max(0.0);
    let end = (hi.ceil() + 1.0).min(len as f64);
    if start >= end {
        return None;
    }
    Some((start as usize, end as usize))
}
