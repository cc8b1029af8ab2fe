//! CF coordinate discovery.
//!
//! Given a data variable, find the variables that supply its time, latitude
//! and longitude coordinates. Coordinate variables named after one of the
//! data variable's dimensions are checked first, in dimension order, then the
//! auxiliary coordinate variables listed in its `coordinates` attribute. The
//! first variable that classifies as the wanted axis wins.
//!
//! The TimeInfo and GeometryInfo factories build on top of this and cache
//! their results per coordinate variable, so items that share a coordinate
//! variable in one file also share the identity of its axis object.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::convention::{
    AXIS, COORDINATES, LATITUDE_STANDARD_NAME, LONGITUDE_STANDARD_NAME, STANDARD_NAME, T_AXIS,
    X_AXIS, Y_AXIS,
};
use crate::error::{BridgeError, Result};
use crate::exchange::{CoordinateArray, GeometryInfo, QuantityInfo, TimeInfo};
use crate::storage::{Storage, Variable};
use crate::time::TimeUnit;
use crate::window::read_variable;

const LATITUDE_UNITS: [&str; 6] = [
    "degrees_north",
    "degree_north",
    "degree_N",
    "degrees_N",
    "degreeN",
    "degreesN",
];

// "degrees_N" instead of "degrees_E" is kept as found in existing files
const LONGITUDE_UNITS: [&str; 6] = [
    "degrees_east",
    "degree_east",
    "degree_E",
    "degrees_N",
    "degreeE",
    "degreesE",
];

/// Coordinate axis a variable can supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    Time,
    Latitude,
    Longitude,
}

impl AxisKind {
    /// Whether `variable` is a coordinate of this kind
    pub fn matches(&self, variable: &Variable) -> bool {
        match self {
            AxisKind::Time => is_time_variable(variable),
            AxisKind::Latitude => is_latitude_variable(variable),
            AxisKind::Longitude => is_longitude_variable(variable),
        }
    }
}

/// Corner a grid's first row should start in once read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridStartCorner {
    NorthWest,
    SouthWest,
    #[default]
    Unknown,
}

impl FromStr for GridStartCorner {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "north_west" | "northwest" | "nw" => Ok(GridStartCorner::NorthWest),
            "south_west" | "southwest" | "sw" => Ok(GridStartCorner::SouthWest),
            "unknown" => Ok(GridStartCorner::Unknown),
            other => Err(format!(
                "invalid grid start corner '{}', expected north_west, south_west or unknown",
                other
            )),
        }
    }
}

impl fmt::Display for GridStartCorner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridStartCorner::NorthWest => write!(f, "north_west"),
            GridStartCorner::SouthWest => write!(f, "south_west"),
            GridStartCorner::Unknown => write!(f, "unknown"),
        }
    }
}

fn attribute_equals(variable: &Variable, attribute: &str, expected: &str) -> bool {
    variable
        .attribute_text(attribute)
        .map_or(false, |value| value.eq_ignore_ascii_case(expected))
}

fn units_in(variable: &Variable, accepted: &[&str]) -> bool {
    variable.units().map_or(false, |units| {
        accepted
            .iter()
            .any(|candidate| units.eq_ignore_ascii_case(candidate))
    })
}

/// `axis = "T"`, or units that parse as a CF time unit. `Hz` is never time.
pub fn is_time_variable(variable: &Variable) -> bool {
    if attribute_equals(variable, AXIS, T_AXIS) {
        return true;
    }

    match variable.units() {
        Some(units) if units.eq_ignore_ascii_case("Hz") => false,
        Some(units) if !units.is_empty() => TimeUnit::is_time_unit(&units),
        _ => false,
    }
}

/// `axis = "Y"`, `standard_name = "latitude"` or a latitude unit
pub fn is_latitude_variable(variable: &Variable) -> bool {
    attribute_equals(variable, AXIS, Y_AXIS)
        || attribute_equals(variable, STANDARD_NAME, LATITUDE_STANDARD_NAME)
        || units_in(variable, &LATITUDE_UNITS)
}

/// `axis = "X"`, `standard_name = "longitude"` or a longitude unit
pub fn is_longitude_variable(variable: &Variable) -> bool {
    attribute_equals(variable, AXIS, X_AXIS)
        || attribute_equals(variable, STANDARD_NAME, LONGITUDE_STANDARD_NAME)
        || units_in(variable, &LONGITUDE_UNITS)
}

/// Find the variable supplying the `kind` axis of `variable`
pub fn find_axis(storage: &dyn Storage, variable: &Variable, kind: AxisKind) -> Option<Variable> {
    // Coordinate variables, in dimension order
    for dimension in &variable.dimensions {
        match storage.find_variable(&dimension.name) {
            Some(candidate) if candidate.is_coordinate_variable() && kind.matches(&candidate) => {
                return Some(candidate);
            }
            _ => {}
        }
    }

    // Auxiliary coordinate variables, in listed order
    if let Some(coordinates) = variable.attribute_text(COORDINATES) {
        for name in coordinates.split_whitespace() {
            match storage.find_variable(name) {
                Some(candidate) if kind.matches(&candidate) => return Some(candidate),
                Some(_) => {}
                None => debug!(
                    variable = %variable.name,
                    coordinate = name,
                    "Listed coordinate variable does not exist"
                ),
            }
        }
    }

    None
}

pub fn find_time_variable(storage: &dyn Storage, variable: &Variable) -> Option<Variable> {
    find_axis(storage, variable, AxisKind::Time)
}

pub fn find_latitude_variable(storage: &dyn Storage, variable: &Variable) -> Option<Variable> {
    find_axis(storage, variable, AxisKind::Latitude)
}

pub fn find_longitude_variable(storage: &dyn Storage, variable: &Variable) -> Option<Variable> {
    find_axis(storage, variable, AxisKind::Longitude)
}

/// Index in `variable` of the first dimension of its latitude variable
pub fn latitude_dimension_index(storage: &dyn Storage, variable: &Variable) -> Option<usize> {
    let latitude = find_latitude_variable(storage, variable)?;
    let first = latitude.dimensions.first()?;
    variable.dimension_index(&first.name)
}

/// Strictly increasing. Sequences of zero or one value count as ascending.
pub fn is_ascending(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[1] > pair[0])
}

/// Dimension to reverse so that a grid read from `variable` starts in
/// `start_corner`.
///
/// Ascending latitudes are flipped for a north-west start, descending ones
/// for a south-west start. An unknown corner never flips.
pub fn dimension_index_to_flip(
    storage: &dyn Storage,
    variable: &Variable,
    start_corner: GridStartCorner,
) -> Result<Option<usize>> {
    if start_corner == GridStartCorner::Unknown {
        return Ok(None);
    }

    let latitude = match find_latitude_variable(storage, variable) {
        Some(latitude) => latitude,
        None => return Ok(None),
    };
    let index = match latitude_dimension_index(storage, variable) {
        Some(index) => index,
        None => return Ok(None),
    };

    let ascending = is_ascending(&read_variable(storage, &latitude)?);
    let flip = match start_corner {
        GridStartCorner::NorthWest => ascending,
        GridStartCorner::SouthWest => !ascending,
        GridStartCorner::Unknown => false,
    };

    Ok(flip.then_some(index))
}

/// TimeInfo and GeometryInfo already built for one open file.
///
/// Must be invalidated when the file changes behind the bridge's back.
#[derive(Debug, Default)]
pub struct DiscoveryCache {
    time_infos: HashMap<String, TimeInfo>,
    geometries: HashMap<(String, String), GeometryInfo>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything cached
    pub fn invalidate(&mut self) {
        self.time_infos.clear();
        self.geometries.clear();
    }

    pub fn len(&self) -> usize {
        self.time_infos.len() + self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read a time variable and convert every value to MJD
fn read_times(storage: &dyn Storage, time_variable: &Variable) -> Result<Vec<f64>> {
    let units = time_variable.units().unwrap_or_default();
    let unit = TimeUnit::parse(&units)?;
    let values = read_variable(storage, time_variable)?;
    Ok(values.into_iter().map(|value| unit.to_mjd(value)).collect())
}

/// TimeInfo for the time axis of `variable`, or `None` if it has none.
///
/// Items whose variables share a time variable get the same TimeInfo.
pub fn create_time_info(
    storage: &dyn Storage,
    variable: &Variable,
    cache: &mut DiscoveryCache,
) -> Result<Option<TimeInfo>> {
    let time_variable = match find_time_variable(storage, variable) {
        Some(time_variable) => time_variable,
        None => {
            debug!(variable = %variable.name, "No time coordinate found");
            return Ok(None);
        }
    };

    if let Some(time_info) = cache.time_infos.get(&time_variable.name) {
        return Ok(Some(time_info.clone()));
    }

    let times = read_times(storage, &time_variable).map_err(|e| match e {
        BridgeError::InvalidTimeUnit { unit } => BridgeError::InvalidTimeUnit {
            unit: format!("{} (time variable {})", unit, time_variable.name),
        },
        other => other,
    })?;

    debug!(
        variable = %variable.name,
        time_variable = %time_variable.name,
        count = times.len(),
        "Created time info"
    );

    let time_info = TimeInfo::new(times);
    cache
        .time_infos
        .insert(time_variable.name.clone(), time_info.clone());
    Ok(Some(time_info))
}

/// For every dimension of `coordinate`, its index among the dimensions of
/// `variable`
fn value_indices(variable: &Variable, coordinate: &Variable) -> Vec<usize> {
    coordinate
        .dimensions
        .iter()
        .filter_map(|dimension| {
            let index = variable.dimension_index(&dimension.name);
            if index.is_none() {
                warn!(
                    variable = %variable.name,
                    coordinate = %coordinate.name,
                    dimension = %dimension.name,
                    "Coordinate dimension is not a dimension of the data variable"
                );
            }
            index
        })
        .collect()
}

fn coordinate_array(
    storage: &dyn Storage,
    variable: &Variable,
    coordinate: &Variable,
    standard_name: &str,
) -> Result<CoordinateArray> {
    let values = read_variable(storage, coordinate)?;
    Ok(CoordinateArray {
        values,
        shape: coordinate.shape(),
        value_indices: value_indices(variable, coordinate),
        quantity: Some(QuantityInfo::new(
            standard_name,
            coordinate.units().unwrap_or_default(),
        )),
    })
}

/// Regular array geometry of `variable`, or `None` unless both a latitude
/// and a longitude variable are found.
pub fn create_geometry_info(
    storage: &dyn Storage,
    variable: &Variable,
    cache: &mut DiscoveryCache,
) -> Result<Option<GeometryInfo>> {
    let latitude = find_latitude_variable(storage, variable);
    let longitude = find_longitude_variable(storage, variable);
    let (latitude, longitude) = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => (latitude, longitude),
        _ => {
            debug!(variable = %variable.name, "No latitude/longitude pair found");
            return Ok(None);
        }
    };

    let key = (latitude.name.clone(), longitude.name.clone());
    if let Some(geometry) = cache.geometries.get(&key) {
        return Ok(Some(geometry.clone()));
    }

    let geometry = GeometryInfo::array(
        coordinate_array(storage, variable, &latitude, LATITUDE_STANDARD_NAME)?,
        coordinate_array(storage, variable, &longitude, LONGITUDE_STANDARD_NAME)?,
    );

    debug!(
        variable = %variable.name,
        latitude = %latitude.name,
        longitude = %longitude.name,
        "Created geometry info"
    );

    cache.geometries.insert(key, geometry.clone());
    Ok(Some(geometry))
}
