use geo::{AffineTransform, Coord};

use crate::errors::{LanduseError, Result};

/// Pixel space to raster crs space.
#[derive(Shrinkwrap, Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(AffineTransform);

impl GeoTransform {
    /// From the GDAL ordering `[xoff, a, b, yoff, d, e]`.
    pub fn from_gdal(gdal_transform: [f64; 6]) -> Self {
        Self(AffineTransform::new(
            gdal_transform[1],
            gdal_transform[2],
            gdal_transform[0],
            gdal_transform[4],
            gdal_transform[5],
            gdal_transform[3],
        ))
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.xoff(),
            self.a(),
            self.b(),
            self.yoff(),
            self.d(),
            self.e(),
        ]
    }

    pub fn inverse(&self) -> Result<PixelTransform> {
        let inverse = self
            .0
            .inverse()
            .ok_or_else(|| LanduseError::NonInvertibleTransform(self.to_gdal()))?;
        Ok(PixelTransform {
            inverse,
            forward: self.0,
        })
    }

    fn is_north_up(&self) -> bool {
        self.b() == 0. && self.d() == 0.
    }

    /// Resolution as `(x, y)` absolute pixel sizes.
    pub fn resolution(&self) -> (f64, f64) {
        (self.a().abs(), self.e().abs())
    }
}

/// Raster crs space to pixel space.
#[derive(Shrinkwrap, Debug, Clone, Copy, PartialEq)]
pub struct PixelTransform {
    #[shrinkwrap(main_field)]
    inverse: AffineTransform,
    forward: AffineTransform,
}

impl PixelTransform {
    /// Pixel `(col, row)` whose footprint holds `coord`.
    ///
    /// Floors both axes, so coordinates on a shared edge belong to
    /// the cell with the higher index.
    pub fn pixel_of(&self, coord: Coord<f64>) -> Option<(i64, i64)> {
        // North-up grids divide directly; the composed inverse can land a
        // hair below an exact edge.
        let Coord { x: col, y: row } = if GeoTransform(self.forward).is_north_up() {
            Coord {
                x: (coord.x - self.forward.xoff()) / self.forward.a(),
                y: (coord.y - self.forward.yoff()) / self.forward.e(),
            }
        } else {
            self.inverse.apply(coord)
        };
        if !(col.is_finite() && row.is_finite()) {
            return None;
        }
        Some((col.floor() as i64, row.floor() as i64))
    }
}
