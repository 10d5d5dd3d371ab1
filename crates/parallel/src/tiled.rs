//! Tiled processing for large rasters
//!
//! A raster is split into non-overlapping core tiles. Each tile is processed
//! on a padded window that extends `halo` cells past the core on every side
//! (clamped to the raster), and only the core is written back. An operation
//! whose output at a cell depends on inputs at most `halo` cells away gives
//! the same result tiled or untiled.

use waterdriver_core::raster::{Raster, RasterElement};
use waterdriver_core::{Error, Result};

use crate::strategy::{ParallelStrategy, ProcessingMode};

/// A core tile and the padded window it is processed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row offset of the core in the source raster
    pub row_offset: usize,
    /// Column offset of the core in the source raster
    pub col_offset: usize,
    /// Number of core rows
    pub rows: usize,
    /// Number of core columns
    pub cols: usize,
    /// Row offset of the padded window
    pub window_row: usize,
    /// Column offset of the padded window
    pub window_col: usize,
    /// Padded window rows
    pub window_rows: usize,
    /// Padded window columns
    pub window_cols: usize,
}

impl Tile {
    /// Core position inside the padded window
    pub fn core_in_window(&self) -> (usize, usize) {
        (
            self.row_offset - self.window_row,
            self.col_offset - self.window_col,
        )
    }
}

/// Iterator over the tiles covering a raster
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_size: usize,
    halo: usize,
    current_row: usize,
    current_col: usize,
}

impl TileIterator {
    /// Create a new tile iterator. A `tile_size` of 0 is treated as 1.
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize, halo: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_size: tile_size.max(1),
            halo,
            current_row: 0,
            current_col: 0,
        }
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let rows = self.tile_size.min(self.total_rows - self.current_row);
        let cols = self.tile_size.min(self.total_cols - self.current_col);

        let window_row = self.current_row.saturating_sub(self.halo);
        let window_col = self.current_col.saturating_sub(self.halo);
        let row_end = (self.current_row + rows + self.halo).min(self.total_rows);
        let col_end = (self.current_col + cols + self.halo).min(self.total_cols);

        let tile = Tile {
            row_offset: self.current_row,
            col_offset: self.current_col,
            rows,
            cols,
            window_row,
            window_col,
            window_rows: row_end - window_row,
            window_cols: col_end - window_col,
        };

        self.current_col += self.tile_size;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_size;
        }

        Some(tile)
    }
}

/// Processor for tiled raster operations
#[derive(Debug, Clone)]
pub struct TiledProcessor {
    tile_size: usize,
    halo: usize,
    mode: ProcessingMode,
}

impl TiledProcessor {
    /// Create a new tiled processor
    pub fn new(tile_size: usize, halo: usize) -> Self {
        Self {
            tile_size: tile_size.max(1),
            halo,
            mode: ProcessingMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn halo(&self) -> usize {
        self.halo
    }

    /// Apply `f` tile by tile and stitch the tile cores into one raster.
    ///
    /// `f` must return a raster with the shape of the window it was given.
    /// A raster that fits in a single tile is passed to `f` whole.
    pub fn apply<T, U, F>(&self, input: &Raster<T>, f: F) -> Result<Raster<U>>
    where
        T: RasterElement,
        U: RasterElement,
        F: Fn(&Raster<T>) -> Result<Raster<U>> + Sync + Send,
    {
        let (rows, cols) = input.shape();
        if rows <= self.tile_size && cols <= self.tile_size {
            return self.mode.install(|| f(input));
        }

        let tiles: Vec<Tile> = TileIterator::new(rows, cols, self.tile_size, self.halo).collect();

        let results: Vec<Result<(Tile, Raster<U>)>> = self.mode.par_map(0..tiles.len(), |i| {
            let tile = tiles[i];
            let window = input.window(
                tile.window_row,
                tile.window_col,
                tile.window_rows,
                tile.window_cols,
            )?;
            let out = f(&window)?;
            if out.shape() != window.shape() {
                return Err(Error::SizeMismatch {
                    er: window.rows(),
                    ec: window.cols(),
                    ar: out.rows(),
                    ac: out.cols(),
                });
            }
            Ok((tile, out))
        });

        let mut data = vec![U::mask_value(); rows * cols];
        let mut nodata = None;

        for result in results {
            let (tile, out) = result?;
            nodata = nodata.or(out.nodata());
            let (r0, c0) = tile.core_in_window();
            for r in 0..tile.rows {
                let dst = (tile.row_offset + r) * cols + tile.col_offset;
                for c in 0..tile.cols {
                    data[dst + c] = unsafe { out.get_unchecked(r0 + r, c0 + c) };
                }
            }
        }

        input.with_data(data, nodata)
    }
}

impl Default for TiledProcessor {
    fn default() -> Self {
        Self::new(512, 0)
    }
}
