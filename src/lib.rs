//! Land cover and soil lookups for US locations, served as MCP tools.
//!
//! Points are given in WGS84 and reprojected into each raster's CRS before
//! the containing cell is read.

#[macro_use]
extern crate shrinkwraprs;

pub mod cli;
pub mod components;
pub mod config;
pub mod crs_geo;
pub mod errors;
pub mod provisioning;
pub mod sampler;
pub mod service;
pub mod tools;

#[cfg(test)]
mod test_utils;

pub use cli::{CliArgs, CliError, ErrorFormat};
pub use components::{Category, CategoryKind, CategoryResult, GdalRaster, Legend, NoData, RasterHandle};
pub use config::Config;
pub use crs_geo::{Crs, CrsCoord, GeoPoint, InvalidCoordinate};
pub use errors::{LanduseError, Result};
pub use provisioning::{DatasetProvisioner, ProvisionOutcome};
pub use sampler::{sample, sample_many};
pub use service::LandUseService;
pub use tools::LandUseServer;
