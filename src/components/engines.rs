use std::{fmt::Debug, path::Path, sync::Arc};

use crate::{
    components::{
        bounds::PixelShape, category::CategoryKind, file::RasterHandle,
        transforms::GeoTransform,
    },
    crs_geo::Crs,
    errors::{LanduseError, Result},
};

/// Implementations for gdal
pub mod gdal_engine {
    use super::*;
    use gdal::{spatial_ref::SpatialRef, Dataset as GdalDataset};
    use log::info;

    /// Prefer an authority code so that crs comparison and proj
    /// setup stay cheap, fall back to WKT.
    fn crs_from_gdal(dataset: &GdalDataset, path: &Path) -> Result<Crs> {
        if dataset.projection().trim().is_empty() {
            return Err(LanduseError::MissingCrs(path.display().to_string()));
        }
        let spatial_ref: SpatialRef = dataset.spatial_ref()?;
        match (spatial_ref.auth_name(), spatial_ref.auth_code()) {
            (Some(name), Ok(code)) => Ok(Crs::from_authority(&name, code)),
            _ => Ok(Crs::new(spatial_ref.to_wkt()?)),
        }
    }

    pub struct GdalRaster {
        path: Arc<Path>,
        dataset: GdalDataset,
        /// 1-based band index.
        band: usize,
        crs: Crs,
        transform: GeoTransform,
        shape: PixelShape,
        nodata: Option<f64>,
        kind: CategoryKind,
    }

    impl Debug for GdalRaster {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let bounds = self.bounds();
            f.debug_struct("GdalRaster")
                .field("path", &self.path)
                .field("band", &self.band)
                .field("crs", &self.crs.as_str())
                .field("shape", &self.shape)
                .field("bounds", &(bounds.min(), bounds.max()))
                .field("nodata", &self.nodata)
                .finish()
        }
    }

    impl GdalRaster {
        pub fn open<P: AsRef<Path>>(path: P, band: usize, kind: CategoryKind) -> Result<Self> {
            let path: Arc<Path> = Arc::from(path.as_ref());
            let dataset = GdalDataset::open(&path)?;
            let available = dataset.raster_count();
            if band == 0 || band > available {
                return Err(LanduseError::BandOutOfRange {
                    requested: band,
                    available,
                });
            }
            let crs = crs_from_gdal(&dataset, &path)?;
            let transform = GeoTransform::from_gdal(dataset.geo_transform()?);
            let shape = PixelShape::from(dataset.raster_size());
            let nodata = dataset.rasterband(band)?.no_data_value();
            let raster = Self {
                path,
                dataset,
                band,
                crs,
                transform,
                shape,
                nodata,
                kind,
            };
            info!("opened {raster:?}");
            Ok(raster)
        }

        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl RasterHandle for GdalRaster {
        fn crs(&self) -> &Crs {
            &self.crs
        }
        fn nodata(&self) -> Option<f64> {
            self.nodata
        }
        fn kind(&self) -> &CategoryKind {
            &self.kind
        }
        fn transform(&self) -> &GeoTransform {
            &self.transform
        }
        fn shape(&self) -> PixelShape {
            self.shape
        }
        fn read_pixel(&self, pixel: (usize, usize)) -> Result<f64> {
            let rasterband = self.dataset.rasterband(self.band)?;
            let buffer = rasterband.read_as::<f64>(
                (pixel.0 as isize, pixel.1 as isize),
                (1, 1),
                (1, 1),
                None,
            )?;
            buffer.data().first().copied().ok_or_else(|| {
                gdal::errors::GdalError::BadArgument(format!(
                    "empty read at {pixel:?} in {}",
                    self.path.display()
                ))
                .into()
            })
        }
    }
}
