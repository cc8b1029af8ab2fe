//! Writes coordinate values for everything a [`WriteSession`] declared.
//!
//! Runs once all variables are declared: time axes go out in the units string
//! already attached to each time variable, 1-D grid coordinates are copied
//! verbatim, and collected station ids are written in collection order.

use tracing::debug;

use crate::codec::encode;
use crate::convention::STATION_ID_VARIABLE_NAME;
use crate::error::{BridgeError, Result};
use crate::exchange::GeometryKind;
use crate::logging::log_session_stats;
use crate::storage::Storage;
use crate::synthesis::{GridVariableProperties, TimeDimension, WriteSession};
use crate::time::TimeUnit;

/// Write time, grid and station id values for a session
pub fn write_metadata(storage: &mut dyn Storage, session: &WriteSession) -> Result<()> {
    write_time_variables(storage, session.time_dimensions())?;
    write_grid_variables(storage, session.grids(), session.config().fill_value)?;
    write_station_ids(storage, session.station_ids())?;

    let data_variables: Vec<&str> = session
        .data_variables()
        .iter()
        .map(String::as_str)
        .collect();
    log_session_stats(
        session.time_dimensions().len(),
        session.grids().len(),
        &data_variables,
        session.station_ids().len(),
    );
    Ok(())
}

/// Convert every MJD time to the units of its time variable and write it
pub fn write_time_variables(storage: &mut dyn Storage, entries: &[TimeDimension]) -> Result<()> {
    for entry in entries {
        let name = entry.dimension.name.as_str();
        let variable = storage.find_variable(name).ok_or_else(|| BridgeError::DataNotFound {
            message: format!("Time variable {} not found", name),
        })?;
        let unit = TimeUnit::parse(&variable.units().unwrap_or_default())?;

        let values: Vec<f64> = entry
            .time_info
            .times()
            .iter()
            .map(|&mjd| unit.from_mjd(mjd))
            .collect();

        storage.write(name, &[0], &[values.len()], &values)?;
        debug!(variable = name, count = values.len(), "Wrote time values");
    }

    Ok(())
}

/// Write the 1-D y/x coordinate values of array geometries
pub fn write_grid_variables(
    storage: &mut dyn Storage,
    grids: &[GridVariableProperties],
    fill_value: f64,
) -> Result<()> {
    for properties in grids {
        let (y_name, x_name) = match (&properties.y_variable, &properties.x_variable) {
            (Some(y), Some(x)) => (y, x),
            _ => continue,
        };
        let grid = match properties.geometry.kind() {
            GeometryKind::Array(grid) => grid,
            GeometryKind::Irregular(_) => continue,
        };

        // NaN does not occur in valid coordinates, but must not reach the file
        let latitudes = encode(&grid.latitude.values, fill_value);
        storage.write(y_name, &[0], &[latitudes.len()], &latitudes)?;

        let longitudes = encode(&grid.longitude.values, fill_value);
        storage.write(x_name, &[0], &[longitudes.len()], &longitudes)?;

        debug!(y = %y_name, x = %x_name, "Wrote grid coordinates");
    }

    Ok(())
}

/// Write station ids, if any were collected
pub fn write_station_ids(storage: &mut dyn Storage, station_ids: &[String]) -> Result<()> {
    if station_ids.is_empty() {
        return Ok(());
    }

    storage.write_text(STATION_ID_VARIABLE_NAME, station_ids)?;
    debug!(count = station_ids.len(), "Wrote station ids");
    Ok(())
}
