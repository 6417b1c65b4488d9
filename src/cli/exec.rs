use std::sync::Arc;

use chrono::NaiveDate;
use log::info;
use serde_json::Value;

use crate::{
    cli::{CliArgs, CliError, Command, PointArgs, QueryKind},
    config::Config,
    crs_geo::GeoPoint,
    provisioning::DatasetProvisioner,
    service::LandUseService,
    tools::{format_dates, format_history, serve_stdio},
};

fn provision(config: &Config) -> Result<(), CliError> {
    let provisioner =
        DatasetProvisioner::http(config.data_dir.clone(), config.download.clone())?;
    let outcome = provisioner.ensure()?;
    info!("dataset in {}: {outcome:?}", config.data_dir.display());
    Ok(())
}

/// Blocking HTTP must not run inside the runtime, so provisioning happens
/// before this is called.
fn serve(config: &Config) -> Result<(), CliError> {
    let service = Arc::new(LandUseService::init(config)?);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let served = runtime.block_on(serve_stdio(Arc::clone(&service)));
    service.teardown();
    Ok(served?)
}

pub(crate) fn query(
    service: &LandUseService,
    kind: QueryKind,
    point: PointArgs,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Value, CliError> {
    let point = GeoPoint::new(point.lat, point.lon)?;
    let answer = match kind {
        QueryKind::LandCover => serde_json::to_value(service.land_cover(point))?,
        QueryKind::Soil => serde_json::to_value(service.soil_type(point))?,
        QueryKind::Dates => serde_json::to_value(format_dates(&service.landuse_dates(point)))?,
        QueryKind::History => serde_json::to_value(format_history(
            service.land_cover_history(point, start, end),
        ))?,
    };
    Ok(answer)
}

fn print(value: &impl serde::Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl CliArgs {
    pub fn load_config(&self) -> Result<Config, CliError> {
        Ok(Config::load_from(self.config.as_deref())?.with_data_dir(self.data_dir.clone()))
    }

    pub fn exec(&self) -> Result<(), CliError> {
        let config = self.load_config()?;
        match self.command() {
            Command::Serve => {
                config.require_soil()?;
                provision(&config)?;
                serve(&config)
            }
            Command::Provision => provision(&config),
            Command::Query {
                kind,
                point,
                start,
                end,
            } => {
                if kind == QueryKind::Soil {
                    config.require_soil()?;
                }
                let service = LandUseService::init(&config)?;
                let answer = query(&service, kind, point, start, end);
                service.teardown();
                print(&answer?)
            }
            Command::Info => {
                let service = LandUseService::init(&config)?;
                let layers = service.layer_infos();
                service.teardown();
                print(&layers)
            }
        }
    }
}
