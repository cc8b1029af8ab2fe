//! Builds exchange items from the variables of an open file.

use std::time::Instant;
use tracing::debug;

use crate::config::ReaderConfig;
use crate::convention::STATION_ID_VARIABLE_NAME;
use crate::discovery::{
    create_geometry_info, create_time_info, dimension_index_to_flip, find_time_variable,
    DiscoveryCache,
};
use crate::error::{BridgeError, Result};
use crate::exchange::{QuantityInfo, Role};
use crate::grid_item::GridTimeSeriesExchangeItem;
use crate::logging::{log_operation_end, log_operation_start};
use crate::storage::{DataType, Storage, Variable};
use crate::window::read_variable;

/// Whether a variable holds data rather than coordinates or station ids
fn is_data_variable(variable: &Variable) -> bool {
    variable.data_type == DataType::Double
        && !variable.is_coordinate_variable()
        && variable.name != STATION_ID_VARIABLE_NAME
}

/// One grid time series item per data variable that has a time dimension.
///
/// Variables without a time coordinate, or whose time coordinate is only an
/// auxiliary coordinate, are skipped.
pub fn grid_exchange_items(
    storage: &dyn Storage,
    config: &ReaderConfig,
    cache: &mut DiscoveryCache,
) -> Result<Vec<GridTimeSeriesExchangeItem>> {
    let start = Instant::now();
    log_operation_start("grid_exchange_items", storage.variables().len());

    let result = collect_grid_items(storage, config, cache);
    log_operation_end(
        "grid_exchange_items",
        start,
        result.as_ref().ok().map(Vec::len),
    );
    result
}

fn collect_grid_items(
    storage: &dyn Storage,
    config: &ReaderConfig,
    cache: &mut DiscoveryCache,
) -> Result<Vec<GridTimeSeriesExchangeItem>> {
    let mut items = Vec::new();

    for variable in storage.variables() {
        if !is_data_variable(&variable) {
            continue;
        }

        let time_variable = match find_time_variable(storage, &variable) {
            Some(time_variable) => time_variable,
            None => continue,
        };
        let time_dimension_index = match time_variable
            .dimensions
            .first()
            .and_then(|dim| variable.dimension_index(&dim.name))
        {
            Some(index) => index,
            None => {
                debug!(
                    variable = %variable.name,
                    time_variable = %time_variable.name,
                    "Time coordinate is not a dimension of the variable, skipping"
                );
                continue;
            }
        };

        let time_info = match create_time_info(storage, &variable, cache)? {
            Some(time_info) => time_info,
            None => continue,
        };
        let geometry_info = create_geometry_info(storage, &variable, cache)?;
        let flip = dimension_index_to_flip(storage, &variable, config.grid_start_corner)?;

        let quantity =
            QuantityInfo::new(variable.name.clone(), variable.units().unwrap_or_default());
        let mut item = GridTimeSeriesExchangeItem::new(
            variable.name.clone(),
            Role::InOut,
            quantity,
            time_info,
            variable.name.clone(),
            time_dimension_index,
        )
        .with_dimension_index_to_flip(flip)
        .with_time_tolerance(config.time_tolerance);
        if let Some(geometry_info) = geometry_info {
            item = item.with_geometry(geometry_info);
        }

        items.push(item);
    }

    Ok(items)
}

/// Station ids stored in the optional `station_id` variable, by index.
///
/// A scalar variable holds one id, a 1-D numeric variable holds numeric ids,
/// and a 2-D char variable holds one fixed-width id per row. Ids are trimmed.
pub fn read_station_ids(storage: &dyn Storage) -> Result<Vec<String>> {
    let variable = match storage.find_variable(STATION_ID_VARIABLE_NAME) {
        Some(variable) => variable,
        None => return Ok(Vec::new()),
    };

    match (variable.dimensions.len(), variable.data_type) {
        (_, DataType::Text) | (_, DataType::Char) => Ok(storage
            .read_text(&variable.name)?
            .iter()
            .map(|id| id.trim().to_string())
            .collect()),
        (0, DataType::Double) => {
            let values = read_variable(storage, &variable)?;
            Ok(values.iter().map(|&value| format_numeric_id(value)).collect())
        }
        (1, DataType::Double) => {
            let values = read_variable(storage, &variable)?;
            if values.is_empty() {
                return Err(BridgeError::DataNotFound {
                    message: format!("No station ids found in variable {}", variable.name),
                });
            }
            Ok(values.iter().map(|&value| format_numeric_id(value)).collect())
        }
        (rank, DataType::Double) => Err(BridgeError::InvalidParameter {
            param: STATION_ID_VARIABLE_NAME.to_string(),
            message: format!("numeric station ids must be scalar or 1-D, got {} dimensions", rank),
        }),
    }
}

/// Numeric ids are single precision in the files that use them
fn format_numeric_id(value: f64) -> String {
    format!("{:?}", value as f32)
}
