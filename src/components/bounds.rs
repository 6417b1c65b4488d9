use geo::{AffineOps, Coord, Rect};

use crate::{components::transforms::GeoTransform, crs_geo::Crs};

/// Extent of a raster in 'geospace' with raster crs.
#[derive(Shrinkwrap, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    crs: Crs,
    #[shrinkwrap(main_field)]
    rect: Rect<f64>,
}

impl GeoBounds {
    pub fn new(crs: Crs, geo_transform: &GeoTransform, shape: PixelShape) -> Self {
        let pixel_rect = Rect::new(
            Coord { x: 0., y: 0. },
            Coord {
                x: shape.width as f64,
                y: shape.height as f64,
            },
        );
        let rect = pixel_rect.affine_transform(geo_transform);
        Self { crs, rect }
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }
}

/// Raster size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelShape {
    pub width: usize,
    pub height: usize,
}

impl From<(usize, usize)> for PixelShape {
    /// From GDAL `(x size, y size)`.
    fn from(value: (usize, usize)) -> Self {
        Self {
            width: value.0,
            height: value.1,
        }
    }
}

impl PixelShape {
    /// `(col, row)` as unsigned indexes, if inside the grid.
    pub fn index(&self, pixel: (i64, i64)) -> Option<(usize, usize)> {
        let col = usize::try_from(pixel.0).ok()?;
        let row = usize::try_from(pixel.1).ok()?;
        (col < self.width && row < self.height).then_some((col, row))
    }
}
