//! Cell value trait for generic rasters

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Floating point rasters mark masked cells with NaN. Integer rasters have no
/// NaN, so they rely on an explicit nodata value (`mask_value`).
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Value written into masked cells when no explicit nodata is set
    fn mask_value() -> Self;

    /// Check if this value is masked under the given nodata value
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_raster_element_int {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn mask_value() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata.map_or(false, |nd| *self == nd)
            }

            fn is_float() -> bool {
                false
            }
        }
    )*};
}

macro_rules! impl_raster_element_float {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn mask_value() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) if !nd.is_nan() => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    _ => false,
                }
            }

            fn is_float() -> bool {
                true
            }
        }
    )*};
}

impl_raster_element_int!(i8, i16, i32, i64, u8, u16, u32, u64);
impl_raster_element_float!(f32, f64);
