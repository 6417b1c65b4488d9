//! Point sampling of categorical rasters.

use log::warn;

use crate::{
    components::{CategoryResult, NoData, RasterHandle},
    crs_geo::GeoPoint,
    errors::Result,
};

/// Category of the cell of `raster` holding `point`.
///
/// Never fails: points outside the raster, nodata cells and read or
/// reprojection failures all come back as [`CategoryResult::NoData`].
pub fn sample<R: RasterHandle + ?Sized>(point: GeoPoint, raster: &R) -> CategoryResult {
    match try_sample(point, raster) {
        Ok(result) => result,
        Err(err) => {
            warn!("Error processing point {point} in {raster:?}: {err}");
            CategoryResult::NoData(NoData::AccessFailure)
        }
    }
}

/// [`sample`] over a batch, one result per point.
pub fn sample_many<R: RasterHandle + ?Sized>(
    points: impl IntoIterator<Item = GeoPoint>,
    raster: &R,
) -> Vec<CategoryResult> {
    points
        .into_iter()
        .map(|point| sample(point, raster))
        .collect()
}

fn try_sample<R: RasterHandle + ?Sized>(point: GeoPoint, raster: &R) -> Result<CategoryResult> {
    let coord = point.to_crs_coord().projected_coord(raster.crs())?;
    let Some(value) = raster.value_at(coord)? else {
        return Ok(CategoryResult::NoData(NoData::OutOfExtent));
    };
    if raster.is_nodata(value) {
        return Ok(CategoryResult::NoData(NoData::Sentinel));
    }
    Ok(CategoryResult::Found(raster.kind().coerce(value)?))
}
