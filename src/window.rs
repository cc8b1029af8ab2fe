//! Windowed reads and writes over N-dimensional variables.
//!
//! A [`Window`] always starts out covering the whole variable and is then
//! narrowed to a single index along the selected dimensions (time, station,
//! realization). Reads decode through the variable's packing attributes,
//! writes encode missing values back to its fill value.

use ndarray::{ArrayD, Axis, IxDyn};
use tracing::debug;

use crate::codec::Packing;
use crate::error::{BridgeError, Result};
use crate::storage::{Storage, Variable};

/// Hyper-rectangular selection, one origin and size entry per dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub origin: Vec<usize>,
    pub size: Vec<usize>,
}

impl Window {
    /// Window covering a whole array of the given shape
    pub fn full(shape: &[usize]) -> Self {
        Self {
            origin: vec![0; shape.len()],
            size: shape.to_vec(),
        }
    }

    /// Window covering a whole variable
    pub fn of(variable: &Variable) -> Self {
        Self::full(&variable.shape())
    }

    /// Narrow one dimension to the single element at `index`.
    ///
    /// The index is not checked against the variable's length here; an
    /// out-of-range window is reported by the storage backend.
    pub fn select(mut self, dimension: usize, index: usize) -> Result<Self> {
        if dimension >= self.origin.len() {
            return Err(BridgeError::InvalidParameter {
                param: "dimension".to_string(),
                message: format!(
                    "dimension index {} out of range for a window of rank {}",
                    dimension,
                    self.origin.len()
                ),
            });
        }

        self.origin[dimension] = index;
        self.size[dimension] = 1;
        Ok(self)
    }

    /// Single time slice of a variable
    pub fn for_time(variable: &Variable, time_dimension: usize, time_index: usize) -> Result<Self> {
        Self::of(variable).select(time_dimension, time_index)
    }

    /// Single station of a variable
    pub fn for_station(
        variable: &Variable,
        station_dimension: usize,
        station_index: usize,
    ) -> Result<Self> {
        Self::of(variable).select(station_dimension, station_index)
    }

    /// Single station and ensemble member of a variable
    pub fn for_station_and_realization(
        variable: &Variable,
        station_dimension: usize,
        station_index: usize,
        realization_dimension: usize,
        realization_index: usize,
    ) -> Result<Self> {
        Self::of(variable)
            .select(station_dimension, station_index)?
            .select(realization_dimension, realization_index)
    }

    /// Single time slice of one ensemble member of a grid variable
    pub fn for_time_and_realization(
        variable: &Variable,
        realization_dimension: usize,
        realization_index: usize,
        time_dimension: usize,
        time_index: usize,
    ) -> Result<Self> {
        Self::of(variable)
            .select(time_dimension, time_index)?
            .select(realization_dimension, realization_index)
    }

    /// Single value of a scalar time series variable laid out as
    /// `[time, stations, ...]`
    pub fn for_time_and_station(
        variable: &Variable,
        time_index: usize,
        station_index: usize,
    ) -> Result<Self> {
        Self::of(variable)
            .select(0, time_index)?
            .select(1, station_index)
    }

    /// Number of elements inside the window
    pub fn element_count(&self) -> usize {
        self.size.iter().product()
    }
}

/// Reverse `values`, laid out row-major with `shape`, along one axis
fn flip(values: Vec<f64>, shape: &[usize], dimension: usize) -> Result<Vec<f64>> {
    if dimension >= shape.len() {
        return Err(BridgeError::InvalidParameter {
            param: "flip_dimension".to_string(),
            message: format!(
                "dimension index {} out of range for a window of rank {}",
                dimension,
                shape.len()
            ),
        });
    }

    let mut array = ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|e| {
        BridgeError::InvalidState {
            message: format!("Window values do not match the window shape: {}", e),
        }
    })?;
    array.invert_axis(Axis(dimension));
    Ok(array.iter().copied().collect())
}

/// Read and decode the values inside a window.
///
/// Returns `None` when the window holds no elements. With `flip_dimension`
/// set, the values are reversed along that dimension before decoding.
pub fn read_window(
    storage: &dyn Storage,
    variable: &Variable,
    window: &Window,
    flip_dimension: Option<usize>,
) -> Result<Option<Vec<f64>>> {
    let raw = storage.read(&variable.name, &window.origin, &window.size)?;
    if raw.is_empty() {
        debug!(variable = %variable.name, "Window holds no values");
        return Ok(None);
    }

    let mut values = match flip_dimension {
        Some(dimension) => flip(raw, &window.size, dimension)?,
        None => raw,
    };

    Packing::from_variable(variable).decode(&mut values);
    Ok(Some(values))
}

/// Encode and write values into a window.
///
/// `flip_dimension` must be the one used to read the values, so they land
/// back in stored orientation.
pub fn write_window(
    storage: &mut dyn Storage,
    variable: &Variable,
    window: &Window,
    values: &[f64],
    flip_dimension: Option<usize>,
) -> Result<()> {
    let packing = Packing::from_variable(variable);
    let encoded = packing.encode(values);

    match flip_dimension {
        Some(dimension) => {
            let flipped = flip(encoded.into_owned(), &window.size, dimension)?;
            storage.write(&variable.name, &window.origin, &window.size, &flipped)
        }
        None => storage.write(&variable.name, &window.origin, &window.size, &encoded),
    }
}

/// Pack semantic values and write them into a window.
///
/// The inverse of [`read_window`]: values are unscaled through the
/// variable's `scale_factor` and `add_offset` and NaN becomes the fill value,
/// so a slice read and written back unchanged keeps its stored values.
pub fn write_window_packed(
    storage: &mut dyn Storage,
    variable: &Variable,
    window: &Window,
    values: &[f64],
    flip_dimension: Option<usize>,
) -> Result<()> {
    let packed = Packing::from_variable(variable).pack(values);

    let packed = match flip_dimension {
        Some(dimension) => flip(packed, &window.size, dimension)?,
        None => packed,
    };
    storage.write(&variable.name, &window.origin, &window.size, &packed)
}

/// Read and decode a whole variable
pub fn read_variable(storage: &dyn Storage, variable: &Variable) -> Result<Vec<f64>> {
    let window = Window::of(variable);
    Ok(read_window(storage, variable, &window, None)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convention::{ADD_OFFSET, FILL_VALUE, SCALE_FACTOR};
    use crate::storage::{AttributeValue, DataType, MemoryStorage};

    fn grid() -> (MemoryStorage, Variable) {
        let mut storage = MemoryStorage::new();
        storage.add_dimension("time", 2).unwrap();
        storage.add_dimension("lat", 2).unwrap();
        storage.add_dimension("lon", 3).unwrap();
        storage
            .add_variable("h", DataType::Double, &["time", "lat", "lon"])
            .unwrap();
        storage
            .add_variable_attribute("h", FILL_VALUE, AttributeValue::Number(-999.0))
            .unwrap();
        let values: Vec<f64> = (0..12).map(f64::from).collect();
        storage
            .write("h", &[0, 0, 0], &[2, 2, 3], &values)
            .unwrap();
        let variable = storage.find_variable("h").unwrap();
        (storage, variable)
    }

    #[test]
    fn test_windows_stay_inside_shape() {
        let (_, variable) = grid();
        let shape = variable.shape();

        for time in 0..2 {
            for lat in 0..2 {
                let windows = [
                    Window::for_time(&variable, 0, time).unwrap(),
                    Window::for_station(&variable, 1, lat).unwrap(),
                    Window::for_station_and_realization(&variable, 1, lat, 0, time).unwrap(),
                    Window::for_time_and_realization(&variable, 1, lat, 0, time).unwrap(),
                    Window::for_time_and_station(&variable, time, lat).unwrap(),
                ];
                for window in windows {
                    for d in 0..shape.len() {
                        assert!(window.origin[d] + window.size[d] <= shape[d]);
                    }
                }
            }
        }
    }

    #[test]
    fn test_select_narrows_only_selected_dimension() {
        let (_, variable) = grid();
        let window = Window::for_time(&variable, 0, 1).unwrap();
        assert_eq!(window.origin, vec![1, 0, 0]);
        assert_eq!(window.size, vec![1, 2, 3]);
        assert_eq!(window.element_count(), 6);

        assert!(Window::of(&variable).select(3, 0).is_err());
    }

    #[test]
    fn test_read_window_decodes_fill() {
        let (mut storage, variable) = grid();
        storage.write("h", &[0, 0, 1], &[1, 1, 1], &[-999.0]).unwrap();

        let window = Window::for_time(&variable, 0, 0).unwrap();
        let values = read_window(&storage, &variable, &window, None).unwrap().unwrap();
        assert_eq!(values[0], 0.0);
        assert!(values[1].is_nan());
        assert_eq!(values[5], 5.0);
    }

    #[test]
    fn test_read_window_flips_rows() {
        let (storage, variable) = grid();
        let window = Window::for_time(&variable, 0, 1).unwrap();
        let values = read_window(&storage, &variable, &window, Some(1))
            .unwrap()
            .unwrap();
        assert_eq!(values, vec![9.0, 10.0, 11.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_write_window_restores_orientation_and_fill() {
        let (mut storage, variable) = grid();
        let window = Window::for_time(&variable, 0, 0).unwrap();
        write_window(
            &mut storage,
            &variable,
            &window,
            &[1.0, 2.0, 3.0, f64::NAN, 5.0, 6.0],
            Some(1),
        )
        .unwrap();

        let raw = storage.read("h", &[0, 0, 0], &[1, 2, 3]).unwrap();
        assert_eq!(raw, vec![-999.0, 5.0, 6.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_write_window_packed_restores_raw_values() {
        let (mut storage, _) = grid();
        storage
            .add_variable_attribute("h", SCALE_FACTOR, AttributeValue::Number(2.0))
            .unwrap();
        storage
            .add_variable_attribute("h", ADD_OFFSET, AttributeValue::Number(0.5))
            .unwrap();
        storage.write("h", &[0, 0, 1], &[1, 1, 1], &[-999.0]).unwrap();
        let variable = storage.find_variable("h").unwrap();
        let window = Window::for_time(&variable, 0, 0).unwrap();
        let before = storage.read("h", &[0, 0, 0], &[1, 2, 3]).unwrap();

        let values = read_window(&storage, &variable, &window, Some(1))
            .unwrap()
            .unwrap();
        write_window_packed(&mut storage, &variable, &window, &values, Some(1)).unwrap();

        assert_eq!(storage.read("h", &[0, 0, 0], &[1, 2, 3]).unwrap(), before);
    }

    #[test]
    fn test_empty_window_reads_none() {
        let mut storage = MemoryStorage::new();
        storage.add_dimension("time", 0).unwrap();
        storage.add_variable("t", DataType::Double, &["time"]).unwrap();
        let variable = storage.find_variable("t").unwrap();

        let result = read_window(&storage, &variable, &Window::of(&variable), None).unwrap();
        assert!(result.is_none());
        assert!(read_variable(&storage, &variable).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_index_is_a_storage_error() {
        let (storage, variable) = grid();
        let window = Window::for_time(&variable, 0, 5).unwrap();
        let result = read_window(&storage, &variable, &window, None);
        assert!(matches!(result, Err(BridgeError::Storage { .. })));
    }

    #[test]
    fn test_read_variable_applies_packing() {
        let (mut storage, _) = grid();
        storage
            .add_variable_attribute("h", SCALE_FACTOR, AttributeValue::Number(2.0))
            .unwrap();
        storage
            .add_variable_attribute("h", ADD_OFFSET, AttributeValue::Number(1.0))
            .unwrap();
        let variable = storage.find_variable("h").unwrap();

        let values = read_variable(&storage, &variable).unwrap();
        assert_eq!(values.len(), 12);
        assert_eq!(values[0], 1.0);
        assert_eq!(values[11], 23.0);
    }
}
