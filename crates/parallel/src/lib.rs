//! # Waterdriver Parallel
//!
//! Parallel execution for raster stages.
//!
//! This crate provides:
//! - `ProcessingMode`: sequential, rayon global pool, or a sized pool
//! - `TiledProcessor`: runs a neighborhood operation tile by tile, each tile
//!   padded with a halo, and stitches the tile interiors back together

pub mod strategy;
pub mod tiled;

pub use strategy::{ParallelStrategy, ProcessingMode};
pub use tiled::{Tile, TileIterator, TiledProcessor};
