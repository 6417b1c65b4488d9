//! Opened raster layers and the lookups served from them.

use std::{
    collections::BTreeMap,
    fmt::Debug,
    path::Path,
    sync::{Mutex, MutexGuard},
};

use chrono::NaiveDate;
use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;

use crate::{
    components::{Category, CategoryKind, GdalRaster, RasterHandle},
    config::Config,
    crs_geo::GeoPoint,
    errors::Result,
    sampler::sample,
};

#[derive(Debug)]
struct DatedLayer {
    date: NaiveDate,
    raster: GdalRaster,
}

impl DatedLayer {
    fn code_at(&self, point: GeoPoint) -> Option<i64> {
        sample(point, &self.raster)
            .found()
            .as_ref()
            .and_then(Category::code)
    }
}

#[derive(Debug)]
struct Layers {
    land_cover: DatedLayer,
    history: Vec<DatedLayer>,
    soil: Option<GdalRaster>,
}

impl Layers {
    /// Primary layer first, then history in configured order.
    fn land_cover_layers(&self) -> impl Iterator<Item = &DatedLayer> {
        std::iter::once(&self.land_cover).chain(self.history.iter())
    }
}

/// Summary of one opened layer.
#[derive(Debug, Clone, Serialize)]
pub struct LayerInfo {
    pub role: &'static str,
    pub date: Option<NaiveDate>,
    pub path: String,
    pub crs: String,
    pub width: usize,
    pub height: usize,
    /// Pixel size `[x, y]` in layer crs units.
    pub resolution: [f64; 2],
    /// `[min x, min y, max x, max y]` in layer crs.
    pub bounds: [f64; 4],
    pub nodata: Option<f64>,
}

impl LayerInfo {
    fn new(role: &'static str, date: Option<NaiveDate>, raster: &GdalRaster) -> Self {
        let bounds = raster.bounds();
        let shape = raster.shape();
        let (x_resolution, y_resolution) = raster.transform().resolution();
        Self {
            role,
            date,
            path: raster.path().display().to_string(),
            crs: raster.crs().to_string(),
            width: shape.width,
            height: shape.height,
            resolution: [x_resolution, y_resolution],
            bounds: [bounds.min().x, bounds.min().y, bounds.max().x, bounds.max().y],
            nodata: raster.nodata(),
        }
    }
}

/// Land cover, soil and land cover history lookups.
///
/// Raster handles are opened by [`LandUseService::init`] and held until
/// [`LandUseService::teardown`]; lookups after teardown find no data.
pub struct LandUseService {
    layers: Mutex<Option<Layers>>,
}

impl Debug for LandUseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LandUseService")
            .field("layers", &self.layers)
            .finish()
    }
}

fn open_layer(config: &Config, file: &Path, band: usize, kind: CategoryKind) -> Result<GdalRaster> {
    GdalRaster::open(config.resolve(file), band, kind)
}

impl LandUseService {
    pub fn init(config: &Config) -> Result<Self> {
        let land_cover = DatedLayer {
            date: config.land_cover.date,
            raster: open_layer(
                config,
                &config.land_cover.file,
                config.land_cover.band,
                CategoryKind::Code,
            )?,
        };
        let history = config
            .history
            .iter()
            .map(|layer| {
                Ok(DatedLayer {
                    date: layer.date,
                    raster: open_layer(config, &layer.file, layer.band, CategoryKind::Code)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let soil = config
            .soil
            .as_ref()
            .map(|soil| {
                open_layer(
                    config,
                    &soil.file,
                    soil.band,
                    CategoryKind::Label(soil.legend.clone()),
                )
            })
            .transpose()?;
        info!(
            "serving {} land cover layers, soil {}",
            history.len() + 1,
            if soil.is_some() { "enabled" } else { "disabled" }
        );
        Ok(Self {
            layers: Mutex::new(Some(Layers {
                land_cover,
                history,
                soil,
            })),
        })
    }

    /// Releases every raster handle.
    pub fn teardown(&self) {
        match self.lock() {
            Some(mut guard) => {
                if guard.take().is_some() {
                    info!("released raster layers");
                }
            }
            None => warn!("raster layers unavailable during teardown"),
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, Option<Layers>>> {
        self.layers.lock().ok()
    }

    /// Runs `f` on the open layers, `default` once released.
    fn with_layers<T>(&self, default: T, f: impl FnOnce(&Layers) -> T) -> T {
        match self.lock() {
            Some(guard) => match guard.as_ref() {
                Some(layers) => f(layers),
                None => {
                    warn!("query after raster layers were released");
                    default
                }
            },
            None => {
                warn!("raster layers lock poisoned");
                default
            }
        }
    }

    /// NLCD class code at `point`.
    pub fn land_cover(&self, point: GeoPoint) -> Option<i64> {
        self.with_layers(None, |layers| layers.land_cover.code_at(point))
    }

    /// Soil group label at `point`, `None` without a soil layer.
    pub fn soil_type(&self, point: GeoPoint) -> Option<String> {
        self.with_layers(None, |layers| match &layers.soil {
            Some(soil) => sample(point, soil).found().map(Category::into_label),
            None => {
                warn!("soil type requested but no soil layer is configured");
                None
            }
        })
    }

    /// Ascending dates of the land cover layers with data at `point`.
    pub fn landuse_dates(&self, point: GeoPoint) -> Vec<NaiveDate> {
        self.with_layers(Vec::new(), |layers| {
            layers
                .land_cover_layers()
                .filter(|layer| sample(point, &layer.raster).is_found())
                .map(|layer| layer.date)
                .sorted()
                .dedup()
                .collect()
        })
    }

    /// Land cover code per layer date within `[start, end]`.
    pub fn land_cover_history(
        &self,
        point: GeoPoint,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> BTreeMap<NaiveDate, Option<i64>> {
        let in_range = |date: NaiveDate| {
            start.is_none_or(|start| start <= date) && end.is_none_or(|end| date <= end)
        };
        self.with_layers(BTreeMap::new(), |layers| {
            let mut history = BTreeMap::new();
            for layer in layers.land_cover_layers().filter(|layer| in_range(layer.date)) {
                history
                    .entry(layer.date)
                    .or_insert_with(|| layer.code_at(point));
            }
            history
        })
    }

    pub fn layer_infos(&self) -> Vec<LayerInfo> {
        self.with_layers(Vec::new(), |layers| {
            layers
                .land_cover_layers()
                .enumerate()
                .map(|(idx, layer)| {
                    let role = if idx == 0 { "land_cover" } else { "history" };
                    LayerInfo::new(role, Some(layer.date), &layer.raster)
                })
                .chain(layers.soil.iter().map(|soil| LayerInfo::new("soil", None, soil)))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        components::Legend,
        config::{HistoryLayer, LandCoverSettings, SoilSettings},
        errors::LanduseError,
        test_utils::{write_geotiff, TestGrid, ALABAMA, DEATH_VALLEY},
    };
    use rstest::{fixture, rstest};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn date(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
    }

    fn point((latitude, longitude): (f64, f64)) -> GeoPoint {
        GeoPoint::new(latitude, longitude).unwrap()
    }

    struct Fixture {
        _dir: TempDir,
        config: Config,
    }

    #[fixture]
    fn dataset() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let ramp = TestGrid::wgs84_ramp();
        write_geotiff(dir.path(), "nlcd_2024.tif", &ramp);
        write_geotiff(dir.path(), "nlcd_2001.tif", &ramp);
        write_geotiff(dir.path(), "nlcd_2019.tif", &ramp);
        // Death Valley masked out in 2011.
        write_geotiff(dir.path(), "nlcd_2011.tif", &ramp.clone().with_cell((6, 6), 0));
        write_geotiff(dir.path(), "wrb.tif", &TestGrid::alabama(7));

        let history = [
            ("2019-01-01", "nlcd_2019.tif"),
            ("2001-01-01", "nlcd_2001.tif"),
            ("2011-01-01", "nlcd_2011.tif"),
            ("2024-01-01", "nlcd_2019.tif"),
        ]
        .into_iter()
        .map(|(day, file)| HistoryLayer {
            date: date(day),
            file: PathBuf::from(file),
            band: 1,
        })
        .collect();

        let config = Config {
            land_cover: LandCoverSettings {
                file: PathBuf::from("nlcd_2024.tif"),
                band: 1,
                date: date("2024-01-01"),
            },
            soil: Some(SoilSettings {
                file: PathBuf::from("wrb.tif"),
                band: 1,
                legend: Legend::wrb_reference_groups(),
            }),
            history,
            ..Config::default()
        }
        .with_data_dir(Some(dir.path().to_path_buf()));
        Fixture { _dir: dir, config }
    }

    #[rstest]
    fn land_cover_and_soil(dataset: Fixture) {
        let service = LandUseService::init(&dataset.config).unwrap();
        assert_eq!(service.land_cover(point(DEATH_VALLEY)), Some(55));
        assert_eq!(service.land_cover(point((0., 0.))), None);
        assert_eq!(
            service.soil_type(point(ALABAMA)).as_deref(),
            Some("Cambisols")
        );
        assert_eq!(service.soil_type(point(DEATH_VALLEY)), None);
    }

    #[rstest]
    fn dates_are_sorted_and_unique(dataset: Fixture) {
        let service = LandUseService::init(&dataset.config).unwrap();
        let dates: Vec<String> = service
            .landuse_dates(point(DEATH_VALLEY))
            .iter()
            .map(|date| date.format("%Y-%m-%d").to_string())
            .collect();
        assert_eq!(dates, vec!["2001-01-01", "2019-01-01", "2024-01-01"]);
        assert!(service.landuse_dates(point((0., 0.))).is_empty());
    }

    #[rstest]
    fn history_respects_range(dataset: Fixture) {
        let service = LandUseService::init(&dataset.config).unwrap();
        let history = service.land_cover_history(
            point(DEATH_VALLEY),
            Some(date("2001-01-01")),
            Some(date("2019-01-01")),
        );
        assert_eq!(
            history.into_iter().collect::<Vec<_>>(),
            vec![
                (date("2001-01-01"), Some(55)),
                (date("2011-01-01"), None),
                (date("2019-01-01"), Some(55)),
            ]
        );
        assert_eq!(
            service
                .land_cover_history(point(DEATH_VALLEY), None, None)
                .len(),
            4
        );
    }

    #[rstest]
    fn soil_is_optional(dataset: Fixture) {
        let config = Config {
            soil: None,
            ..dataset.config.clone()
        };
        let service = LandUseService::init(&config).unwrap();
        assert_eq!(service.soil_type(point(ALABAMA)), None);
    }

    #[rstest]
    fn teardown_releases_layers(dataset: Fixture) {
        let service = LandUseService::init(&dataset.config).unwrap();
        assert_eq!(service.layer_infos().len(), 6);
        service.teardown();
        assert_eq!(service.land_cover(point(DEATH_VALLEY)), None);
        assert!(service.landuse_dates(point(DEATH_VALLEY)).is_empty());
        assert!(service.layer_infos().is_empty());
    }

    #[rstest]
    fn layer_infos_describe_rasters(dataset: Fixture) {
        let service = LandUseService::init(&dataset.config).unwrap();
        let infos = service.layer_infos();
        assert_eq!(infos[0].role, "land_cover");
        assert_eq!(infos[0].crs, "EPSG:4326");
        assert_eq!((infos[0].width, infos[0].height), (8, 8));
        assert_eq!(infos[0].resolution, [0.5, 0.5]);
        assert_eq!(infos[0].bounds, [-120., 36., -116., 40.]);
        assert_eq!(infos.last().unwrap().role, "soil");
    }

    #[rstest]
    fn missing_layer_fails_init(dataset: Fixture) {
        let config = Config {
            land_cover: LandCoverSettings {
                file: PathBuf::from("absent.tif"),
                ..dataset.config.land_cover.clone()
            },
            ..dataset.config.clone()
        };
        assert!(matches!(
            LandUseService::init(&config),
            Err(LanduseError::GdalError(_))
        ));
    }

    /// Needs the Annual NLCD 2024 bundle in `./data` (`landuse-mcp provision`).
    #[rstest]
    #[ignore]
    fn annual_nlcd_2024() {
        let service = LandUseService::init(&Config::default()).unwrap();
        const NLCD_CLASSES: [i64; 16] = [
            11, 12, 21, 22, 23, 24, 31, 41, 42, 43, 52, 71, 81, 82, 90, 95,
        ];
        let code = service.land_cover(point(DEATH_VALLEY)).unwrap();
        assert!(NLCD_CLASSES.contains(&code));
        assert_eq!(
            service.landuse_dates(point(DEATH_VALLEY)),
            vec![date("2024-01-01")]
        );
        assert_eq!(service.land_cover(point((0., 0.))), None);
        assert!(service.landuse_dates(point((0., 0.))).is_empty());
        assert!(service.land_cover(point(ALABAMA)).is_some());
    }

    /// Needs `landuse.json` in the crate root with a `soil` layer over
    /// the provisioned data directory.
    #[rstest]
    #[ignore]
    fn alabama_soil_type() {
        let config = Config::load_from(Some(Path::new("landuse.json"))).unwrap();
        config.require_soil().unwrap();
        let service = LandUseService::init(&config).unwrap();
        let soil = service.soil_type(point(ALABAMA)).unwrap();
        assert!(!soil.is_empty());
        assert!(soil.parse::<i64>().is_err(), "unlabelled soil code {soil}");
    }
}
