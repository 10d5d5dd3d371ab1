//! Coordinate reference system identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate reference system, identified by EPSG code or WKT.
///
/// The pipeline never reprojects between CRSs itself; it only checks that
/// every layer shares one CRS and that the CRS has metric units, because
/// kernel radii and scales are given in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
}

/// EPSG codes of common geographic (degree-based) CRSs.
const GEOGRAPHIC_EPSG: [u32; 4] = [4326, 4258, 4269, 4167];

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether coordinates are angular (degrees) rather than projected.
    pub fn is_geographic(&self) -> bool {
        if let Some(code) = self.epsg {
            return GEOGRAPHIC_EPSG.contains(&code);
        }
        self.wkt
            .as_deref()
            .map(|w| w.trim_start().starts_with("GEOGCS") || w.trim_start().starts_with("GEOGCRS"))
            .unwrap_or(false)
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt
                .char_indices()
                .nth(50)
                .map(|(i, _)| i)
                .unwrap_or(wkt.len());
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(32647);
        assert_eq!(crs.epsg(), Some(32647));
        assert_eq!(crs.identifier(), "EPSG:32647");
        assert!(!crs.is_geographic());
    }

    #[test]
    fn test_crs_equivalence() {
        assert!(CRS::from_epsg(4326).is_equivalent(&CRS::wgs84()));
        assert!(!CRS::from_epsg(32647).is_equivalent(&CRS::wgs84()));
        assert!(!CRS::from_epsg(4326).is_equivalent(&CRS::from_wkt("GEOGCS[\"WGS 84\"]")));
    }

    #[test]
    fn test_geographic_detection() {
        assert!(CRS::wgs84().is_geographic());
        assert!(CRS::from_wkt("GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\"]]").is_geographic());
        assert!(!CRS::from_wkt("PROJCS[\"WGS 84 / UTM zone 47N\"]").is_geographic());
    }
}
