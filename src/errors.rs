pub type Result<T> = std::result::Result<T, LanduseError>;

#[derive(thiserror::Error, Debug)]
pub enum LanduseError {
    #[error(transparent)]
    ProjError(#[from] proj::ProjError),
    #[error(transparent)]
    ProjCreateError(#[from] proj::ProjCreateError),
    #[error(transparent)]
    GdalError(#[from] gdal::errors::GdalError),
    #[error("Raster `{0}` does not declare a coordinate reference system")]
    MissingCrs(String),
    #[error("Geotransform {0:?} is not invertible")]
    NonInvertibleTransform([f64; 6]),
    #[error("Projected coordinate ({x}, {y}) is not finite")]
    NonFiniteCoordinate { x: f64, y: f64 },
    #[error("Raster has {available} bands, band {requested} requested")]
    BandOutOfRange { requested: usize, available: usize },
    #[error("Value {0} could not be cast to a category code")]
    Uncastable(f64),
}
