//! Connected pixel counts
//!
//! Labels groups of adjacent foreground cells (unmasked, non-zero) and
//! writes each group's size back to its cells. Labeling always runs on the
//! whole grid: a component crossing a tile boundary would otherwise be
//! split and undercounted.

use waterdriver_core::raster::Raster;
use waterdriver_core::{Error, Result};

use crate::algebra::cell;

/// Size of the connected component each foreground cell belongs to.
///
/// Counts are capped at `max_size`, so a cell reads `max_size` for every
/// component of at least that many cells. Background and masked cells are
/// masked in the output.
///
/// # Arguments
/// * `mask` - Binary raster; unmasked non-zero cells are foreground
/// * `max_size` - Count cap, at least 1
/// * `eight_connected` - Use 8-connectivity instead of 4-connectivity
pub fn connected_pixel_count(
    mask: &Raster<f64>,
    max_size: usize,
    eight_connected: bool,
) -> Result<Raster<f64>> {
    if max_size == 0 {
        return Err(Error::InvalidParameter {
            name: "max_size",
            value: "0".to_string(),
            reason: "pixel count cap must be at least 1".to_string(),
        });
    }

    let (rows, cols) = mask.shape();
    let nodata = mask.nodata();
    let foreground: Vec<bool> = mask
        .data()
        .iter()
        .map(|&v| matches!(cell(v, nodata), Some(v) if v != 0.0))
        .collect();

    let mut output = vec![f64::NAN; rows * cols];
    let mut visited = vec![false; rows * cols];
    let mut members = Vec::new();

    for start in 0..rows * cols {
        if !foreground[start] || visited[start] {
            continue;
        }

        members.clear();
        flood_fill(&foreground, &mut visited, rows, cols, start, eight_connected, &mut members);

        let count = members.len().min(max_size) as f64;
        for &idx in &members {
            output[idx] = count;
        }
    }

    mask.with_data(output, Some(f64::NAN))
}

fn flood_fill(
    foreground: &[bool],
    visited: &mut [bool],
    rows: usize,
    cols: usize,
    start: usize,
    eight_connected: bool,
    members: &mut Vec<usize>,
) {
    let mut stack = vec![start];
    visited[start] = true;

    while let Some(idx) = stack.pop() {
        members.push(idx);
        let (r, c) = ((idx / cols) as isize, (idx % cols) as isize);

        for dr in -1..=1isize {
            for dc in -1..=1isize {
                if dr == 0 && dc == 0 {
                    continue;
                }
                if !eight_connected && dr != 0 && dc != 0 {
                    continue;
                }
                let (nr, nc) = (r + dr, c + dc);
                if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                    continue;
                }
                let n = nr as usize * cols + nc as usize;
                if foreground[n] && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }
    }
}
