use std::path::{Path, PathBuf};

use gdal::{raster::Buffer, spatial_ref::SpatialRef, DriverManager};

pub const DEATH_VALLEY: (f64, f64) = (36.5322649, -116.9325408);
pub const ALABAMA: (f64, f64) = (32.95047, -87.393259);

/// Single band u8 grid written to disk as a GeoTIFF.
#[derive(Debug, Clone)]
pub struct TestGrid {
    pub epsg: u32,
    pub geo_transform: [f64; 6],
    pub width: usize,
    pub height: usize,
    pub nodata: Option<f64>,
    /// Row-major.
    pub values: Vec<u8>,
}

impl TestGrid {
    pub fn uniform(
        epsg: u32,
        geo_transform: [f64; 6],
        (width, height): (usize, usize),
        value: u8,
        nodata: Option<f64>,
    ) -> Self {
        Self {
            epsg,
            geo_transform,
            width,
            height,
            nodata,
            values: vec![value; width * height],
        }
    }

    pub fn with_cell(mut self, (col, row): (usize, usize), value: u8) -> Self {
        self.values[row * self.width + col] = value;
        self
    }

    pub fn value(&self, col: usize, row: usize) -> f64 {
        f64::from(self.values[row * self.width + col])
    }

    /// 8x8 half degree cells over the Mojave, `1..=63` row-major with
    /// the last cell set to nodata (0). Death Valley is cell (6, 6).
    pub fn wgs84_ramp() -> Self {
        let mut grid = Self::uniform(4326, [-120., 0.5, 0., 40., 0., -0.5], (8, 8), 0, Some(0.));
        for (idx, value) in grid.values.iter_mut().enumerate() {
            *value = (idx + 1) as u8;
        }
        grid.with_cell((7, 7), 0)
    }

    /// 100 km CONUS Albers cells, value is column + 1.
    pub fn albers_death_valley() -> Self {
        let mut grid = Self::uniform(
            5070,
            [-2_500_000., 100_000., 0., 3_200_000., 0., -100_000.],
            (50, 40),
            0,
            Some(255.),
        );
        for (idx, value) in grid.values.iter_mut().enumerate() {
            *value = (idx % 50 + 1) as u8;
        }
        grid
    }

    /// Half degree WGS84 cells around Alabama holding `value`.
    pub fn alabama(value: u8) -> Self {
        Self::uniform(4326, [-88., 0.5, 0., 34., 0., -0.5], (4, 4), value, Some(255.))
    }
}

pub fn write_geotiff(dir: &Path, name: &str, grid: &TestGrid) -> PathBuf {
    let path = dir.join(name);
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<u8, _>(&path, grid.width, grid.height, 1)
        .unwrap();
    dataset.set_geo_transform(&grid.geo_transform).unwrap();
    dataset
        .set_spatial_ref(&SpatialRef::from_epsg(grid.epsg).unwrap())
        .unwrap();
    let mut band = dataset.rasterband(1).unwrap();
    band.set_no_data_value(grid.nodata).unwrap();
    let mut buffer = Buffer::new((grid.width, grid.height), grid.values.clone());
    band.write((0, 0), (grid.width, grid.height), &mut buffer)
        .unwrap();
    path
}
