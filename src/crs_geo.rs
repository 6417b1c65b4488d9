use std::{fmt::Display, sync::Arc};

use geo::Coord;
use log::debug;
use proj::Proj;

use crate::errors::{LanduseError, Result};

const WGS84_ALIASES: [&str; 2] = ["EPSG:4326", "OGC:CRS84"];

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum InvalidCoordinate {
    #[error("Latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("Longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// Coordinate reference system definition, either an authority code
/// (`EPSG:5070`) or WKT.
#[derive(Shrinkwrap, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Crs(Arc<str>);

impl Crs {
    pub fn new(definition: impl AsRef<str>) -> Self {
        Self(Arc::from(definition.as_ref().trim()))
    }

    pub fn wgs84() -> Self {
        Self::new(WGS84_ALIASES[0])
    }

    pub fn from_authority(name: &str, code: i32) -> Self {
        Self::new(format!("{name}:{code}"))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    pub fn is_wgs84(&self) -> bool {
        WGS84_ALIASES
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(self.as_str()))
    }

    /// Both sides resolve to geographic lon/lat.
    fn same_as(&self, other: &Crs) -> bool {
        self == other || (self.is_wgs84() && other.is_wgs84())
    }
}

impl Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A WGS84 geographic point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> std::result::Result<Self, InvalidCoordinate> {
        if !latitude.is_finite() || !(-90. ..=90.).contains(&latitude) {
            return Err(InvalidCoordinate::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180. ..=180.).contains(&longitude) {
            return Err(InvalidCoordinate::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Point as an `(x, y) = (lon, lat)` coordinate tagged with WGS84.
    pub fn to_crs_coord(self) -> CrsCoord {
        CrsCoord::new(
            Crs::wgs84(),
            Coord {
                x: self.longitude,
                y: self.latitude,
            },
        )
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Coordinate together with the CRS it is expressed in.
#[derive(Shrinkwrap, Debug, Clone, PartialEq)]
pub struct CrsCoord {
    crs: Crs,
    #[shrinkwrap(main_field)]
    coord: Coord<f64>,
}

impl CrsCoord {
    pub fn new(crs: Crs, coord: Coord<f64>) -> Self {
        Self { crs, coord }
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn with_crs(self, crs: &Crs) -> Result<Self> {
        let coord = self.projected_coord(crs)?;
        Ok(Self {
            crs: crs.clone(),
            coord,
        })
    }

    /// Copies if crs is same.
    pub fn projected_coord(&self, crs: &Crs) -> Result<Coord<f64>> {
        if self.crs.same_as(crs) {
            return Ok(self.coord);
        }
        let proj = Proj::new_known_crs(self.crs.as_str(), crs.as_str(), None)?;
        let (x, y) = proj.convert((self.coord.x, self.coord.y))?;
        if !(x.is_finite() && y.is_finite()) {
            return Err(LanduseError::NonFiniteCoordinate { x, y });
        }
        debug!("projected {:?} from {} to ({x}, {y})", self.coord, self.crs);
        Ok(Coord { x, y })
    }
}
