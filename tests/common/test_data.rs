//! Test data generation utilities.
//!
//! Each function builds an in-memory file with a known layout and known
//! values, laid out the way CF files produced by models usually are.

use cfbridge::convention::{
    ADD_OFFSET, AXIS, COORDINATES, DEFAULT_FILL_VALUE, FILL_VALUE, SCALE_FACTOR, STANDARD_NAME,
    UNITS,
};
use cfbridge::storage::{AttributeValue, DataType, MemoryStorage, Storage};
use cfbridge::Result;

/// Units placing stored day values directly on the MJD axis
pub const MJD_DAYS: &str = "days since 1858-11-17 00:00:00";

/// Add a 1-D coordinate variable named after its own dimension
pub fn add_coordinate(
    storage: &mut MemoryStorage,
    name: &str,
    values: &[f64],
    attributes: &[(&str, &str)],
) -> Result<()> {
    storage.add_dimension(name, values.len())?;
    storage.add_variable(name, DataType::Double, &[name])?;
    for (attribute, value) in attributes {
        storage.add_variable_attribute(name, attribute, AttributeValue::from(*value))?;
    }
    storage.write(name, &[0], &[values.len()], values)
}

/// A `[time, lat, lon]` temperature grid.
///
/// Two daily times from 1970-01-01, three latitudes (ascending or
/// descending), four longitudes. Stored value `i` is the row-major element
/// index, except element 5 which holds the fill value.
pub fn create_temperature_grid(latitudes_ascending: bool) -> Result<MemoryStorage> {
    let mut storage = MemoryStorage::new();

    add_coordinate(
        &mut storage,
        "time",
        &[0.0, 1.0],
        &[(AXIS, "T"), (UNITS, "days since 1970-01-01 00:00:00")],
    )?;
    let latitudes = if latitudes_ascending {
        [50.0, 51.0, 52.0]
    } else {
        [52.0, 51.0, 50.0]
    };
    add_coordinate(
        &mut storage,
        "lat",
        &latitudes,
        &[(AXIS, "Y"), (UNITS, "degrees_north")],
    )?;
    add_coordinate(
        &mut storage,
        "lon",
        &[3.0, 3.5, 4.0, 4.5],
        &[(AXIS, "X"), (UNITS, "degrees_east")],
    )?;

    storage.add_variable("t2m", DataType::Double, &["time", "lat", "lon"])?;
    storage.add_variable_attribute("t2m", UNITS, AttributeValue::from("K"))?;
    storage.add_variable_attribute("t2m", FILL_VALUE, AttributeValue::from(DEFAULT_FILL_VALUE))?;

    let mut values: Vec<f64> = (0..24).map(f64::from).collect();
    values[5] = DEFAULT_FILL_VALUE;
    storage.write("t2m", &[0, 0, 0], &[2, 3, 4], &values)?;

    Ok(storage)
}

/// A single packed variable `p` over dimension `n` holding `raw`
pub fn create_packed_variable(
    raw: &[f64],
    fill_value: f64,
    scale_factor: f64,
    add_offset: f64,
) -> Result<MemoryStorage> {
    let mut storage = MemoryStorage::new();
    storage.add_dimension("n", raw.len())?;
    storage.add_variable("p", DataType::Double, &["n"])?;
    storage.add_variable_attribute("p", FILL_VALUE, AttributeValue::from(fill_value))?;
    storage.add_variable_attribute("p", SCALE_FACTOR, AttributeValue::from(scale_factor))?;
    storage.add_variable_attribute("p", ADD_OFFSET, AttributeValue::from(add_offset))?;
    storage.write("p", &[0], &[raw.len()], raw)?;
    Ok(storage)
}

/// A model state `h[time, cell]` with times given in MJD and `cells` cells,
/// all initialised to zero
pub fn create_model_state(times: &[f64], cells: usize) -> Result<MemoryStorage> {
    let mut storage = MemoryStorage::new();
    add_coordinate(&mut storage, "time", times, &[(UNITS, MJD_DAYS)])?;
    storage.add_dimension("cell", cells)?;
    storage.add_variable("h", DataType::Double, &["time", "cell"])?;
    storage.add_variable_attribute("h", UNITS, AttributeValue::from("m"))?;
    storage.write(
        "h",
        &[0, 0],
        &[times.len(), cells],
        &vec![0.0; times.len() * cells],
    )?;
    Ok(storage)
}

/// Station time series whose positions are auxiliary coordinates:
/// `waterlevel[time, stations]` with `coordinates = "lon lat"`
pub fn create_station_series() -> Result<MemoryStorage> {
    let mut storage = MemoryStorage::new();
    add_coordinate(
        &mut storage,
        "time",
        &[0.0, 10.0, 20.0],
        &[(STANDARD_NAME, "time"), (UNITS, "minutes since 2020-01-01 00:00:00 +0000")],
    )?;
    storage.add_dimension("stations", 2)?;
    for (name, values, standard_name) in [
        ("lat", [52.96, 51.44], "latitude"),
        ("lon", [4.75, 3.60], "longitude"),
    ] {
        storage.add_variable(name, DataType::Double, &["stations"])?;
        storage.add_variable_attribute(name, STANDARD_NAME, AttributeValue::from(standard_name))?;
        storage.write(name, &[0], &[2], &values)?;
    }

    storage.add_variable("waterlevel", DataType::Double, &["time", "stations"])?;
    storage.add_variable_attribute("waterlevel", UNITS, AttributeValue::from("m"))?;
    storage.add_variable_attribute("waterlevel", COORDINATES, AttributeValue::from("lon lat"))?;
    storage.write(
        "waterlevel",
        &[0, 0],
        &[3, 2],
        &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
    )?;

    storage.add_dimension("char_leng_id", 12)?;
    storage.add_variable("station_id", DataType::Char, &["stations", "char_leng_id"])?;
    storage.write_text(
        "station_id",
        &["den_helder".to_string(), "vlissingen".to_string()],
    )?;

    Ok(storage)
}
