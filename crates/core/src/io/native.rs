//! Native GeoTIFF reading/writing on top of the `tiff` crate
//!
//! Supports the subset of GeoTIFF the pipeline exchanges with its
//! collaborators: a pixel-scale + tiepoint transform, an EPSG code in the
//! GeoKey directory, and a GDAL nodata tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32Float, GrayI32};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Write the GDAL nodata tag when the raster has a nodata value
    pub write_nodata: bool,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self { write_nodata: true }
    }
}

/// Read a single-band GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn cast_all<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or(T::mask_value()))
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Ok(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_epsg(&mut decoder).map(CRS::from_epsg));

    if let Ok(text) = decoder.get_tag_ascii_string(Tag::Unknown(GDAL_NODATA)) {
        let parsed = text.trim_matches(char::from(0)).trim().parse::<f64>().ok();
        raster.set_nodata(parsed.and_then(num_traits::cast));
    }

    Ok(raster)
}

/// Read the transform from ModelPixelScale + ModelTiepoint
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE))
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT))
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// EPSG code from the projected or geographic GeoKey, if present
fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u32> {
    let keys = decoder.get_tag_u16_vec(Tag::Unknown(GEO_KEY_DIRECTORY)).ok()?;
    let mut geographic = None;
    for entry in keys.chunks_exact(4).skip(1) {
        // [KeyID, TIFFTagLocation, Count, Value]; location 0 means inline value
        if entry[1] != 0 {
            continue;
        }
        match entry[0] {
            PROJECTED_CS_TYPE_KEY => return Some(u32::from(entry[3])),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(u32::from(entry[3])),
            _ => {}
        }
    }
    geographic
}

fn geo_keys(crs: Option<&CRS>) -> Vec<u16> {
    let epsg = crs.and_then(|c| c.epsg()).and_then(|e| u16::try_from(e).ok());
    let geographic = crs.map_or(false, |c| c.is_geographic());
    let model_type = if geographic { 2 } else { 1 };

    let mut keys = vec![
        GT_MODEL_TYPE_KEY, 0, 1, model_type,
        GT_RASTER_TYPE_KEY, 0, 1, 1, // RasterPixelIsArea
    ];
    if let Some(code) = epsg {
        let key = if geographic { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
        keys.extend_from_slice(&[key, 0, 1, code]);
    }
    let count = (keys.len() / 4) as u16;
    let mut directory = vec![1, 1, 0, count];
    directory.extend(keys);
    directory
}

/// Write a Raster to a GeoTIFF file.
///
/// Float rasters are written as 32-bit float, integer rasters as 32-bit
/// signed integer.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_geotiff(raster, file, &options.unwrap_or_default())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), &options.unwrap_or_default())?;
    Ok(buf)
}

macro_rules! write_image {
    ($encoder:expr, $color:ty, $data:expr, $raster:expr, $options:expr) => {{
        let (rows, cols) = $raster.shape();
        let mut image = $encoder
            .new_image::<$color>(cols as u32, rows as u32)
            .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

        let gt = $raster.transform();
        let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
        image
            .encoder()
            .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])
            .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        image
            .encoder()
            .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])
            .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

        let keys = geo_keys($raster.crs());
        image
            .encoder()
            .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), keys.as_slice())
            .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

        if $options.write_nodata {
            if let Some(nd) = $raster.nodata().and_then(|v| v.to_f64()) {
                let text = if nd.is_nan() { "nan".to_string() } else { nd.to_string() };
                image
                    .encoder()
                    .write_tag(Tag::Unknown(GDAL_NODATA), text.as_str())
                    .map_err(|e| Error::Other(format!("Cannot write nodata tag: {}", e)))?;
            }
        }

        image
            .write_data($data)
            .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;
    }};
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: &GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    if T::is_float() {
        let data: Vec<f32> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
            .collect();
        write_image!(encoder, Gray32Float, &data, raster, options);
    } else {
        let data: Vec<i32> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(i32::MIN))
            .collect();
        write_image!(encoder, GrayI32, &data, raster, options);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_buffer_roundtrip_keeps_georeference() {
        let mut raster: Raster<f64> = Raster::filled(3, 4, 1.5);
        raster.set(1, 2, f64::NAN).unwrap();
        raster.set_transform(GeoTransform::north_up(1000.0, 5000.0, 300.0));
        raster.set_crs(Some(CRS::from_epsg(32647)));

        let bytes = write_geotiff_to_buffer(&raster, None).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes).unwrap();

        assert_eq!(back.shape(), (3, 4));
        assert_eq!(back.get(0, 0).unwrap(), 1.5);
        assert!(back.get(1, 2).unwrap().is_nan());
        assert!(back.transform().same_lattice(raster.transform()));
        assert_eq!(back.crs().and_then(|c| c.epsg()), Some(32647));
    }

    #[test]
    fn test_integer_raster_keeps_nodata() {
        let mut raster: Raster<i32> = Raster::filled(2, 2, 37);
        raster.set_nodata(Some(i32::MIN));
        raster.set(0, 0, i32::MIN).unwrap();

        let bytes = write_geotiff_to_buffer(&raster, None).unwrap();
        let back: Raster<i32> = read_geotiff_from_buffer(&bytes).unwrap();

        assert_eq!(back.nodata(), Some(i32::MIN));
        assert_eq!(back.get(0, 0).unwrap(), i32::MIN);
        assert_eq!(back.get(1, 1).unwrap(), 37);
        assert_eq!(back.valid_count(), 3);
    }
}
