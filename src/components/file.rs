use std::fmt::Debug;

use geo::Coord;

use crate::{
    components::{
        bounds::{GeoBounds, PixelShape},
        category::CategoryKind,
        transforms::GeoTransform,
    },
    crs_geo::Crs,
    errors::Result,
};

/// Read-only categorical raster.
///
/// The crs is fixed when the handle is opened.
pub trait RasterHandle: Debug {
    fn crs(&self) -> &Crs;
    fn nodata(&self) -> Option<f64>;
    fn kind(&self) -> &CategoryKind;
    fn transform(&self) -> &GeoTransform;
    fn shape(&self) -> PixelShape;
    /// Raw value of one cell, `(col, row)` from the top left.
    fn read_pixel(&self, pixel: (usize, usize)) -> Result<f64>;

    fn bounds(&self) -> GeoBounds {
        GeoBounds::new(self.crs().clone(), self.transform(), self.shape())
    }

    /// Raw value of the cell holding `coord` (in raster crs),
    /// `None` if outside the raster.
    fn value_at(&self, coord: Coord<f64>) -> Result<Option<f64>> {
        let pixel_transform = self.transform().inverse()?;
        match pixel_transform
            .pixel_of(coord)
            .and_then(|pixel| self.shape().index(pixel))
        {
            Some(pixel) => self.read_pixel(pixel).map(Some),
            None => Ok(None),
        }
    }

    fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || self.nodata().is_some_and(|nodata| nodata == value)
    }
}
