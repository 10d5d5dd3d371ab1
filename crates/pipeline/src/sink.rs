//! Export sinks for the finished driver raster

use std::path::{Path, PathBuf};

use tracing::info;
use waterdriver_core::io::write_geotiff;
use waterdriver_core::raster::Raster;

use crate::error::{PipelineError, Result};

/// Receives the finished raster under a destination name such as
/// `driver/water`.
pub trait ExportSink {
    fn export(&mut self, raster: &Raster<i32>, destination: &str) -> Result<()>;
}

/// Keeps exported rasters in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    exports: Vec<(String, Raster<i32>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent raster exported under `destination`
    pub fn get(&self, destination: &str) -> Option<&Raster<i32>> {
        self.exports
            .iter()
            .rev()
            .find(|(name, _)| name == destination)
            .map(|(_, raster)| raster)
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

impl ExportSink for MemorySink {
    fn export(&mut self, raster: &Raster<i32>, destination: &str) -> Result<()> {
        self.exports.push((destination.to_string(), raster.clone()));
        Ok(())
    }
}

/// Writes `<root>/<destination>.tif`, creating directories as needed
#[derive(Debug, Clone)]
pub struct GeoTiffSink {
    root: PathBuf,
}

impl GeoTiffSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File written for `destination`
    pub fn path_for(&self, destination: &str) -> PathBuf {
        self.root.join(format!("{}.tif", destination.trim_matches('/')))
    }
}

impl ExportSink for GeoTiffSink {
    fn export(&mut self, raster: &Raster<i32>, destination: &str) -> Result<()> {
        let path = self.path_for(destination);
        let fail = |reason: String| PipelineError::Export {
            destination: destination.to_string(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }
        write_geotiff(raster, &path, None).map_err(|e| fail(e.to_string()))?;

        info!(destination, path = %path.display(), "exported raster");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waterdriver_core::io::read_geotiff;
    use waterdriver_core::GeoTransform;

    fn driver() -> Raster<i32> {
        let mut r = Raster::from_vec(vec![0, 150, i32::MIN, 400], 2, 2).unwrap();
        r.set_transform(GeoTransform::north_up(500_000.0, 4_000_000.0, 300.0));
        r.set_nodata(Some(i32::MIN));
        r
    }

    #[test]
    fn test_memory_sink_keeps_latest() {
        let mut sink = MemorySink::new();
        sink.export(&driver(), "driver/water").unwrap();
        sink.export(&driver().like(7), "driver/water").unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.get("driver/water").unwrap().get(0, 0).unwrap(), 7);
        assert!(sink.get("driver/other").is_none());
    }

    #[test]
    fn test_geotiff_sink_writes_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = GeoTiffSink::new(dir.path());
        sink.export(&driver(), "driver/water").unwrap();

        let path = dir.path().join("driver").join("water.tif");
        assert_eq!(sink.path_for("driver/water"), path);
        let back: Raster<i32> = read_geotiff(&path).unwrap();
        assert_eq!(back.get(0, 1).unwrap(), 150);
        assert_eq!(back.scale(), 300.0);
    }
}
