//! Writing exchange items into a file.
//!
//! [`ExchangeItemWriter`] owns the storage and the [`WriteSession`] for one
//! file. Items are declared first, then the coordinate metadata is written
//! once, then values can be written in any order.

use tracing::debug;

use crate::config::WriterConfig;
use crate::error::{BridgeError, Result};
use crate::exchange::ExchangeItem;
use crate::logging::log_timed_operation;
use crate::metadata_writer::write_metadata;
use crate::storage::{Storage, Variable};
use crate::synthesis::{station_id_for, WriteSession};
use crate::window::{write_window, Window};

pub struct ExchangeItemWriter<S: Storage> {
    storage: S,
    session: WriteSession,
    metadata_written: bool,
}

impl<S: Storage> ExchangeItemWriter<S> {
    pub fn new(storage: S, config: WriterConfig) -> Self {
        Self {
            storage,
            session: WriteSession::new(config),
            metadata_written: false,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn session(&self) -> &WriteSession {
        &self.session
    }

    /// Give back the storage, e.g. to close the file
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn ensure_declaring(&self) -> Result<()> {
        if self.metadata_written {
            return Err(BridgeError::InvalidState {
                message: "items cannot be declared after the metadata was written".to_string(),
            });
        }
        Ok(())
    }

    /// Declare dimensions and the data variable of one item
    pub fn declare(&mut self, item: &dyn ExchangeItem) -> Result<()> {
        self.ensure_declaring()?;
        self.session.ensure_metadata(&mut self.storage, item)
    }

    /// Declare a batch of scalar time series stored per station
    pub fn declare_scalar_series(&mut self, items: &[&dyn ExchangeItem]) -> Result<()> {
        self.ensure_declaring()?;
        self.session.ensure_scalar_metadata(&mut self.storage, items)
    }

    /// Write time, grid and station id values for everything declared
    pub fn write_metadata(&mut self) -> Result<()> {
        let storage = &mut self.storage;
        let session = &self.session;
        log_timed_operation("write_metadata", || write_metadata(storage, session))?;
        self.metadata_written = true;
        Ok(())
    }

    fn data_variable(&self, item: &dyn ExchangeItem) -> Result<Variable> {
        let quantity = item.quantity_info().ok_or_else(|| BridgeError::MissingQuantity {
            item_id: item.id().to_string(),
        })?;
        self.storage
            .find_variable(&quantity.quantity)
            .ok_or_else(|| BridgeError::DataNotFound {
                message: format!(
                    "Variable {} of item {} has not been declared",
                    quantity.quantity,
                    item.id()
                ),
            })
    }

    fn write_checked(
        &mut self,
        item: &dyn ExchangeItem,
        variable: &Variable,
        window: &Window,
        values: &[f64],
    ) -> Result<()> {
        let expected = window.element_count();
        if values.len() != expected {
            return Err(BridgeError::LengthMismatch {
                item_id: item.id().to_string(),
                expected,
                actual: values.len(),
            });
        }
        write_window(&mut self.storage, variable, window, values, None)
    }

    /// Write all values of an item into its whole data variable
    pub fn write_item_values(&mut self, item: &dyn ExchangeItem) -> Result<()> {
        let variable = self.data_variable(item)?;
        let values = item.values_as_doubles()?;
        self.write_checked(item, &variable, &Window::of(&variable), &values)?;

        debug!(
            item = item.id(),
            variable = %variable.name,
            count = values.len(),
            "Wrote item values"
        );
        Ok(())
    }

    /// Write one time slice of an item
    pub fn write_values_for_time_index(
        &mut self,
        item: &dyn ExchangeItem,
        time_index: usize,
        values: &[f64],
    ) -> Result<()> {
        let time_info = item.time_info().ok_or_else(|| BridgeError::InvalidParameter {
            param: "item".to_string(),
            message: format!("item {} has no time axis", item.id()),
        })?;
        let time_dimension = self
            .session
            .time_dimension_for(time_info)
            .ok_or_else(|| BridgeError::InvalidState {
                message: format!("time axis of item {} has not been declared", item.id()),
            })?
            .name
            .clone();

        let variable = self.data_variable(item)?;
        let dimension = variable
            .dimension_index(&time_dimension)
            .ok_or_else(|| BridgeError::InvalidState {
                message: format!(
                    "variable {} does not have time dimension {}",
                    variable.name, time_dimension
                ),
            })?;

        let window = Window::for_time(&variable, dimension, time_index)?;
        self.write_checked(item, &variable, &window, values)
    }

    /// Write the value of a scalar series at one time, in the column of the
    /// item's station
    pub fn write_scalar_value(
        &mut self,
        item: &dyn ExchangeItem,
        time_index: usize,
        value: f64,
    ) -> Result<()> {
        let variable = self.data_variable(item)?;
        let quantity = item.quantity_info().map(|q| q.quantity.as_str()).unwrap_or_default();
        let station_id = station_id_for(item.id(), quantity);
        let station_index = self.session.station_index(&station_id).ok_or_else(|| {
            BridgeError::DataNotFound {
                message: format!(
                    "Station {} of item {} has not been declared",
                    station_id,
                    item.id()
                ),
            }
        })?;

        let window = Window::for_time_and_station(&variable, time_index, station_index)?;
        self.write_checked(item, &variable, &window, &[value])
    }
}
