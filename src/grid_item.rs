//! Exchange item for a grid time series stored in a file.
//!
//! The item is a view: it holds the name of its data variable and the index
//! of the time dimension within it, and reads or writes one time slice at a
//! time through the storage it is handed. Values go in and out decoded;
//! writes pack them again through the variable's scale and offset.

use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::exchange::{ExchangeItem, GeometryInfo, QuantityInfo, Role, TimeInfo, ValueType};
use crate::storage::{Storage, Variable};
use crate::time::find_matching_time_index;
use crate::window::{read_window, write_window_packed, Window};

/// Default tolerance in days for matching a source time to a stored time
pub const DEFAULT_TIME_TOLERANCE: f64 = 1e-5;

#[derive(Debug, Clone)]
pub struct GridTimeSeriesExchangeItem {
    id: String,
    role: Role,
    quantity_info: QuantityInfo,
    time_info: TimeInfo,
    geometry_info: Option<GeometryInfo>,
    variable_name: String,
    time_dimension_index: usize,
    dimension_index_to_flip: Option<usize>,
    time_tolerance: f64,
}

impl GridTimeSeriesExchangeItem {
    pub fn new(
        id: impl Into<String>,
        role: Role,
        quantity_info: QuantityInfo,
        time_info: TimeInfo,
        variable_name: impl Into<String>,
        time_dimension_index: usize,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            quantity_info,
            time_info,
            geometry_info: None,
            variable_name: variable_name.into(),
            time_dimension_index,
            dimension_index_to_flip: None,
            time_tolerance: DEFAULT_TIME_TOLERANCE,
        }
    }

    pub fn with_geometry(mut self, geometry_info: GeometryInfo) -> Self {
        self.geometry_info = Some(geometry_info);
        self
    }

    /// Present grids reversed along this dimension
    pub fn with_dimension_index_to_flip(mut self, dimension: Option<usize>) -> Self {
        self.dimension_index_to_flip = dimension;
        self
    }

    pub fn with_time_tolerance(mut self, tolerance: f64) -> Self {
        self.time_tolerance = tolerance;
        self
    }

    pub fn variable_name(&self) -> &str {
        &self.variable_name
    }

    pub fn time_dimension_index(&self) -> usize {
        self.time_dimension_index
    }

    pub fn dimension_index_to_flip(&self) -> Option<usize> {
        self.dimension_index_to_flip
    }

    /// Geometry at one time. Constant in time within one file.
    pub fn geometry_info_for_time_index(&self, _time_index: usize) -> Option<&GeometryInfo> {
        self.geometry_info.as_ref()
    }

    fn variable(&self, storage: &dyn Storage) -> Result<Variable> {
        storage
            .find_variable(&self.variable_name)
            .ok_or_else(|| BridgeError::DataNotFound {
                message: format!(
                    "Variable {} of item {} not found",
                    self.variable_name, self.id
                ),
            })
    }

    /// Decoded values of one time slice, `None` if the slice is empty
    pub fn values_for_time_index(
        &self,
        storage: &dyn Storage,
        time_index: usize,
    ) -> Result<Option<Vec<f64>>> {
        let variable = self.variable(storage)?;
        let window = Window::for_time(&variable, self.time_dimension_index, time_index)?;
        read_window(storage, &variable, &window, self.dimension_index_to_flip)
    }

    /// Direct writes of a time slice are not supported by this item.
    /// Use [`copy_values_from_item`](Self::copy_values_from_item),
    /// [`axpy`](Self::axpy) or [`multiply`](Self::multiply).
    pub fn set_values_for_time_index(
        &self,
        _storage: &mut dyn Storage,
        _time_index: usize,
        _values: &[f64],
    ) -> Result<()> {
        Err(BridgeError::Unsupported {
            item_id: self.id.clone(),
            operation: "set_values_for_time_index".to_string(),
        })
    }

    fn write_time_slice(
        &self,
        storage: &mut dyn Storage,
        time_index: usize,
        values: &[f64],
    ) -> Result<()> {
        let variable = self.variable(storage)?;
        let window = Window::for_time(&variable, self.time_dimension_index, time_index)?;
        if values.len() != window.element_count() {
            return Err(BridgeError::LengthMismatch {
                item_id: self.id.clone(),
                expected: window.element_count(),
                actual: values.len(),
            });
        }
        write_window_packed(
            storage,
            &variable,
            &window,
            values,
            self.dimension_index_to_flip,
        )
    }

    /// Copy the values of a source item that holds exactly one time.
    ///
    /// Values for inactive cells of the source geometry are padded with NaN.
    /// Returns the time index written, or `None` if the source time is not
    /// one of this item's times, in which case nothing is written.
    pub fn copy_values_from_item(
        &self,
        storage: &mut dyn Storage,
        source: &dyn ExchangeItem,
    ) -> Result<Option<usize>> {
        let source_time = match source.time_info() {
            Some(time_info) if time_info.len() == 1 => time_info.times()[0],
            _ => {
                return Err(BridgeError::InvalidParameter {
                    param: "source".to_string(),
                    message: format!(
                        "cannot copy values from item {} into {}: it holds no time or more than one time",
                        source.id(),
                        self.id
                    ),
                });
            }
        };

        if source.value_type() != ValueType::Vector {
            return Err(BridgeError::UnsupportedValueType {
                item_id: source.id().to_string(),
                value_type: source.value_type().to_string(),
            });
        }

        let mut values = source.values_as_doubles()?;
        if let Some(geometry) = source.geometry_info() {
            values = geometry.add_missing_values_for_inactive_cells(values)?;
        }

        self.set_values_for_single_time(storage, source_time, &values)
    }

    /// Write values for the stored time matching `time` within the item's
    /// tolerance. A time that does not match writes nothing.
    pub fn set_values_for_single_time(
        &self,
        storage: &mut dyn Storage,
        time: f64,
        values: &[f64],
    ) -> Result<Option<usize>> {
        let time_index =
            match find_matching_time_index(self.time_info.times(), time, self.time_tolerance) {
                Some(time_index) => time_index,
                None => {
                    debug!(item = %self.id, time = time, "No matching time, nothing written");
                    return Ok(None);
                }
            };

        self.write_time_slice(storage, time_index, values)?;
        Ok(Some(time_index))
    }

    fn current_slice(&self, storage: &dyn Storage, time_index: usize) -> Result<Vec<f64>> {
        Ok(self
            .values_for_time_index(storage, time_index)?
            .unwrap_or_default())
    }

    fn check_length(&self, expected: usize, actual: usize) -> Result<()> {
        if expected != actual {
            return Err(BridgeError::LengthMismatch {
                item_id: self.id.clone(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// `values[i] += alpha * axpy_values[i]` on one time slice
    pub fn axpy(
        &self,
        storage: &mut dyn Storage,
        time_index: usize,
        alpha: f64,
        axpy_values: &[f64],
    ) -> Result<()> {
        let mut values = self.current_slice(storage, time_index)?;
        self.check_length(values.len(), axpy_values.len())?;

        values
            .iter_mut()
            .zip(axpy_values)
            .for_each(|(value, operand)| *value += alpha * operand);

        self.write_time_slice(storage, time_index, &values)
    }

    /// `values[i] *= factors[i]` on one time slice
    pub fn multiply(
        &self,
        storage: &mut dyn Storage,
        time_index: usize,
        factors: &[f64],
    ) -> Result<()> {
        let mut values = self.current_slice(storage, time_index)?;
        self.check_length(values.len(), factors.len())?;

        values
            .iter_mut()
            .zip(factors)
            .for_each(|(value, factor)| *value *= factor);

        self.write_time_slice(storage, time_index, &values)
    }
}

impl ExchangeItem for GridTimeSeriesExchangeItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> Role {
        self.role
    }

    fn quantity_info(&self) -> Option<&QuantityInfo> {
        Some(&self.quantity_info)
    }

    fn time_info(&self) -> Option<&TimeInfo> {
        Some(&self.time_info)
    }

    fn geometry_info(&self) -> Option<&GeometryInfo> {
        self.geometry_info.as_ref()
    }

    fn value_type(&self) -> ValueType {
        ValueType::Vector
    }

    /// Values depend on time; use [`GridTimeSeriesExchangeItem::values_for_time_index`]
    fn values_as_doubles(&self) -> Result<Vec<f64>> {
        Err(BridgeError::InvalidState {
            message: format!(
                "values of item {} depend on time, read them per time index",
                self.id
            ),
        })
    }
}
