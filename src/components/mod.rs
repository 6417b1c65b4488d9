pub mod bounds;
pub mod category;
pub mod engines;
pub mod file;
pub mod transforms;

pub use bounds::{GeoBounds, PixelShape};
pub use category::{Category, CategoryKind, CategoryResult, Legend, NoData};
pub use engines::gdal_engine::GdalRaster;
pub use file::RasterHandle;
pub use transforms::{GeoTransform, PixelTransform};
