//! CF convention names and defaults shared by readers and writers.
//!
//! These strings end up in files that other tools read, so they must match
//! the CF conventions exactly.

// attribute names
pub const STANDARD_NAME: &str = "standard_name";
pub const LONG_NAME: &str = "long_name";
pub const UNITS: &str = "units";
pub const CALENDAR: &str = "calendar";
pub const AXIS: &str = "axis";
pub const FILL_VALUE: &str = "_FillValue";
pub const MISSING_VALUE: &str = "missing_value";
pub const SCALE_FACTOR: &str = "scale_factor";
pub const ADD_OFFSET: &str = "add_offset";
pub const COORDINATES: &str = "coordinates";

/// NetCDF default fill value for doubles
pub const DEFAULT_FILL_VALUE: f64 = 9.96921e36;
pub const DEFAULT_CALENDAR: &str = "gregorian";

pub const T_AXIS: &str = "T";
pub const X_AXIS: &str = "X";
pub const Y_AXIS: &str = "Y";
pub const PROJECTION_Y_COORDINATE: &str = "projection_y_coordinate";
pub const PROJECTION_X_COORDINATE: &str = "projection_x_coordinate";

// variable and dimension names
pub const TIME_VARIABLE_NAME: &str = "time";
pub const LATITUDE_STANDARD_NAME: &str = "latitude";
pub const LONGITUDE_STANDARD_NAME: &str = "longitude";
pub const Y_VARIABLE_NAME: &str = "y";
pub const X_VARIABLE_NAME: &str = "x";
pub const FACE_DIMENSION_NAME: &str = "n_face";
pub const STATION_DIMENSION_NAME: &str = "stations";
pub const STATION_ID_VARIABLE_NAME: &str = "station_id";
pub const STATION_ID_LENGTH_DIMENSION_NAME: &str = "char_leng_id";
pub const STATION_ID_LONG_NAME: &str = "station identification code";

/// Fixed width of one station id in the station id variable
pub const STATION_ID_WIDTH: usize = 30;

/// Name for the n-th distinct occurrence of an axis in one file:
/// `time`, `time2`, `time3`, ...
pub fn numbered_name(base: &str, occurrence: usize) -> String {
    if occurrence <= 1 {
        base.to_string()
    } else {
        format!("{}{}", base, occurrence)
    }
}
