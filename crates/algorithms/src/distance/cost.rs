//! Bounded cost-distance accumulation
//!
//! Computes the accumulated cost of traveling from source cells across a cost
//! surface using Dijkstra's algorithm with 8-connectivity.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use waterdriver_core::raster::Raster;
use waterdriver_core::{Error, Result};

use super::{checked_scale, source_flags};

/// Parameters for cost distance
#[derive(Debug, Clone, Default)]
pub struct CostDistanceParams {
    /// Source cell locations as (row, col) pairs
    pub sources: Vec<(usize, usize)>,
    /// Cells whose accumulated cost exceeds this bound are masked
    pub max_cost: Option<f64>,
}

impl CostDistanceParams {
    /// Sources taken from the unmasked non-zero cells of `mask`
    pub fn from_mask(mask: &Raster<f64>) -> Self {
        let cols = mask.cols();
        let sources = source_flags(mask)
            .into_iter()
            .enumerate()
            .filter(|(_, s)| *s)
            .map(|(idx, _)| (idx / cols, idx % cols))
            .collect();
        Self {
            sources,
            max_cost: None,
        }
    }

    pub fn with_max_cost(mut self, max_cost: f64) -> Self {
        self.max_cost = Some(max_cost);
        self
    }
}

/// State in the priority queue (min-heap via reversed ordering).
#[derive(Debug, Clone, PartialEq)]
struct State {
    cost: f64,
    row: usize,
    col: usize,
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}

/// 8-connected neighbor offsets with their step length in cells.
const NEIGHBORS: [(isize, isize, f64); 8] = [
    (-1, -1, std::f64::consts::SQRT_2),
    (-1, 0, 1.0),
    (-1, 1, std::f64::consts::SQRT_2),
    (0, -1, 1.0),
    (0, 1, 1.0),
    (1, -1, std::f64::consts::SQRT_2),
    (1, 0, 1.0),
    (1, 1, std::f64::consts::SQRT_2),
];

/// Compute accumulated cost distance from source cells.
///
/// The cost of a step between two neighbours is the mean of their cost
/// values times the step length in meters (`scale` for cardinal steps,
/// `sqrt(2) * scale` for diagonal ones). A uniform cost of 1 therefore
/// accumulates ground distance along 8-connected paths.
///
/// # Arguments
/// * `cost_surface` - Cost per meter; NaN or negative cells are barriers
/// * `params` - Source cells and optional cost bound
///
/// # Returns
/// Accumulated minimum cost from the nearest source. Sources have cost 0.
/// Unreachable cells, and cells beyond `max_cost`, are NaN. Without any
/// source the result is fully masked.
pub fn cost_distance(cost_surface: &Raster<f64>, params: CostDistanceParams) -> Result<Raster<f64>> {
    let scale = checked_scale(cost_surface)?;
    let (rows, cols) = cost_surface.shape();

    let bound = match params.max_cost {
        Some(m) if !m.is_finite() || m <= 0.0 => {
            return Err(Error::InvalidParameter {
                name: "max_cost",
                value: m.to_string(),
                reason: "cost bound must be positive".to_string(),
            })
        }
        Some(m) => m + 1e-9,
        None => f64::INFINITY,
    };

    let mut dist = vec![f64::INFINITY; rows * cols];
    let mut heap = BinaryHeap::new();

    for &(r, c) in &params.sources {
        if r < rows && c < cols {
            dist[r * cols + c] = 0.0;
            heap.push(State { cost: 0.0, row: r, col: c });
        }
    }

    while let Some(State { cost, row, col }) = heap.pop() {
        if cost > dist[row * cols + col] {
            continue;
        }

        let cost_here = unsafe { cost_surface.get_unchecked(row, col) };
        if cost_here.is_nan() || cost_here < 0.0 {
            continue;
        }

        for &(dr, dc, step) in &NEIGHBORS {
            let nr = row as isize + dr;
            let nc = col as isize + dc;

            if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                continue;
            }

            let nr = nr as usize;
            let nc = nc as usize;
            let cost_neighbor = unsafe { cost_surface.get_unchecked(nr, nc) };

            if cost_neighbor.is_nan() || cost_neighbor < 0.0 {
                continue;
            }

            let new_cost = cost + (cost_here + cost_neighbor) / 2.0 * step * scale;
            if new_cost > bound {
                continue;
            }

            if new_cost < dist[nr * cols + nc] {
                dist[nr * cols + nc] = new_cost;
                heap.push(State { cost: new_cost, row: nr, col: nc });
            }
        }
    }

    for d in &mut dist {
        if d.is_infinite() {
            *d = f64::NAN;
        }
    }

    cost_surface.with_data(dist, Some(f64::NAN))
}
