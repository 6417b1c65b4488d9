use miette::Diagnostic;
use thiserror::Error;

use crate::{
    config::ConfigError, crs_geo::InvalidCoordinate, errors::LanduseError,
    provisioning::ProvisioningError, tools::ServeError,
};

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(
        code(cli_error::config),
        help("Check the file passed to --config; unknown keys are rejected. Soil lookups need a `soil` entry with the raster `file` and optionally its `band` and `legend`.")
    )]
    Config(#[from] ConfigError),
    #[error("Could not provision the dataset: {0}")]
    #[diagnostic(
        code(cli_error::provisioning),
        help("Check network access, or place the listed files in the data directory by hand.")
    )]
    Provisioning(#[from] ProvisioningError),
    #[error("Could not open the raster layers: {0}")]
    #[diagnostic(
        code(cli_error::layers),
        help("Run `landuse-mcp provision` first, or point --data-dir at the dataset.")
    )]
    Layers(#[from] LanduseError),
    #[error(transparent)]
    #[diagnostic(code(cli_error::coordinate))]
    Coordinate(#[from] InvalidCoordinate),
    #[error("Could not start the async runtime: {0}")]
    #[diagnostic(code(cli_error::runtime))]
    Runtime(std::io::Error),
    #[error(transparent)]
    #[diagnostic(code(cli_error::serve))]
    Serve(#[from] ServeError),
    #[error("Could not write output: {0}")]
    #[diagnostic(code(cli_error::output))]
    Output(#[from] serde_json::Error),
}
