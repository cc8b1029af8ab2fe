//! Metadata synthesis for exchange items written to a file.
//!
//! Before any values can be written, every item needs its dimensions and a
//! data variable. Time axes and geometries are shared between items: a second
//! item holding the same [`TimeInfo`] (by identity, not by value) reuses the
//! dimension created for the first one. Distinct axes get numbered names,
//! `time`, `time2`, `time3`, and so on, counted per [`WriteSession`].

use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::WriterConfig;
use crate::convention::{
    numbered_name, AXIS, CALENDAR, FACE_DIMENSION_NAME, FILL_VALUE, LONG_NAME,
    PROJECTION_X_COORDINATE, PROJECTION_Y_COORDINATE, STANDARD_NAME, STATION_DIMENSION_NAME,
    STATION_ID_LENGTH_DIMENSION_NAME, STATION_ID_LONG_NAME, STATION_ID_VARIABLE_NAME, T_AXIS,
    TIME_VARIABLE_NAME, UNITS, X_AXIS, X_VARIABLE_NAME, Y_AXIS, Y_VARIABLE_NAME,
};
use crate::error::{BridgeError, Result};
use crate::exchange::{ExchangeItem, GeometryInfo, GeometryKind, QuantityInfo, TimeInfo, ValueType};
use crate::storage::{AttributeValue, DataType, Dimension, Storage};
use crate::time::create_time_unit_string;

/// Time dimension created for one TimeInfo
#[derive(Debug, Clone)]
pub struct TimeDimension {
    pub time_info: TimeInfo,
    pub dimension: Dimension,
}

/// Dimensions created for one geometry, plus the names of its 1-D y/x
/// coordinate variables when those were created too
#[derive(Debug, Clone)]
pub struct GridVariableProperties {
    pub geometry: GeometryInfo,
    pub dimensions: Vec<Dimension>,
    pub y_variable: Option<String>,
    pub x_variable: Option<String>,
}

/// Everything one writer has declared in one file.
///
/// Counters only ever grow, so a name handed out once is never handed out
/// again in the same file. A session must not be shared between writers.
#[derive(Debug, Clone)]
pub struct WriteSession {
    config: WriterConfig,
    time_count: usize,
    face_count: usize,
    grid_count: usize,
    time_dimensions: Vec<TimeDimension>,
    grids: Vec<GridVariableProperties>,
    station_ids: Vec<String>,
    station_dimension: Option<Dimension>,
    data_variables: Vec<String>,
}

impl Default for WriteSession {
    fn default() -> Self {
        Self::new(WriterConfig::default())
    }
}

/// Storage type of the data variable for an item
fn data_type_for(item: &dyn ExchangeItem) -> Result<DataType> {
    match item.value_type() {
        ValueType::Double
        | ValueType::Doubles
        | ValueType::Doubles2d
        | ValueType::Floats
        | ValueType::Int
        | ValueType::Array
        | ValueType::Vector => Ok(DataType::Double),
        ValueType::Text => Ok(DataType::Text),
        ValueType::Other(value_type) => Err(BridgeError::UnsupportedValueType {
            item_id: item.id().to_string(),
            value_type,
        }),
    }
}

fn quantity_of(item: &dyn ExchangeItem) -> Result<&QuantityInfo> {
    item.quantity_info().ok_or_else(|| BridgeError::MissingQuantity {
        item_id: item.id().to_string(),
    })
}

/// Station id implied by an item id of the form `<station>.<quantity>`
pub fn station_id_for(item_id: &str, quantity: &str) -> String {
    item_id
        .strip_suffix(quantity)
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or(item_id)
        .to_string()
}

impl WriteSession {
    pub fn new(config: WriterConfig) -> Self {
        Self {
            config,
            time_count: 0,
            face_count: 0,
            grid_count: 0,
            time_dimensions: Vec::new(),
            grids: Vec::new(),
            station_ids: Vec::new(),
            station_dimension: None,
            data_variables: Vec::new(),
        }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Time dimensions in creation order
    pub fn time_dimensions(&self) -> &[TimeDimension] {
        &self.time_dimensions
    }

    /// Grid dimensions in creation order
    pub fn grids(&self) -> &[GridVariableProperties] {
        &self.grids
    }

    /// Station ids in collection order
    pub fn station_ids(&self) -> &[String] {
        &self.station_ids
    }

    /// Names of the data variables created so far
    pub fn data_variables(&self) -> &[String] {
        &self.data_variables
    }

    /// Dimension created for `time_info`, if any
    pub fn time_dimension_for(&self, time_info: &TimeInfo) -> Option<&Dimension> {
        self.time_dimensions
            .iter()
            .find(|entry| entry.time_info.same_axis(time_info))
            .map(|entry| &entry.dimension)
    }

    /// Position of a station in the station dimension
    pub fn station_index(&self, station_id: &str) -> Option<usize> {
        self.station_ids.iter().position(|id| id == station_id)
    }

    /// Declare dimensions and the data variable for one item.
    ///
    /// Calling this again for items sharing the same axis objects and
    /// quantity creates nothing new.
    pub fn ensure_metadata(
        &mut self,
        storage: &mut dyn Storage,
        item: &dyn ExchangeItem,
    ) -> Result<()> {
        let quantity = quantity_of(item)?;
        let data_type = data_type_for(item)?;

        let mut dimensions = Vec::new();

        if let Some(time_info) = item.time_info() {
            dimensions.push(self.ensure_time_dimension(storage, time_info)?);
        }

        if let Some(geometry) = item.geometry_info() {
            dimensions.extend(self.ensure_grid_dimensions(storage, geometry)?);
        }

        self.ensure_data_variable(storage, quantity, data_type, &dimensions)
    }

    /// Declare metadata for a batch of scalar time series sharing one time
    /// axis, one value per station.
    ///
    /// Station ids come from the item ids (`<station>.<quantity>`) and are
    /// stored in a fixed-width `station_id` variable over a `stations`
    /// dimension. The time axis of the first item is used for all of them.
    pub fn ensure_scalar_metadata(
        &mut self,
        storage: &mut dyn Storage,
        items: &[&dyn ExchangeItem],
    ) -> Result<()> {
        let first = match items.first() {
            Some(first) => *first,
            None => {
                debug!("No scalar items to declare");
                return Ok(());
            }
        };

        // Validate everything before the file is touched
        let mut declared = Vec::with_capacity(items.len());
        for item in items {
            declared.push((quantity_of(*item)?, data_type_for(*item)?));
        }

        let mut station_ids = self.station_ids.clone();
        for (item, (quantity, _)) in items.iter().zip(&declared) {
            let station_id = station_id_for(item.id(), &quantity.quantity);
            if station_id.chars().count() > self.config.station_id_width {
                return Err(BridgeError::InvalidParameter {
                    param: "item_id".to_string(),
                    message: format!(
                        "station id '{}' of item {} is longer than {} characters",
                        station_id,
                        item.id(),
                        self.config.station_id_width
                    ),
                });
            }
            if !station_ids.contains(&station_id) {
                station_ids.push(station_id);
            }
        }

        let mut dimensions = Vec::new();
        if let Some(time_info) = first.time_info() {
            dimensions.push(self.ensure_time_dimension(storage, time_info)?);
        }

        let stations = match self.station_dimension.clone() {
            Some(existing) if existing.size == station_ids.len() => existing,
            Some(existing) => {
                return Err(BridgeError::InvalidState {
                    message: format!(
                        "station dimension already declared with {} stations, items need {}",
                        existing.size,
                        station_ids.len()
                    ),
                });
            }
            None => self.create_station_variable(storage, station_ids.len())?,
        };
        self.station_ids = station_ids;
        dimensions.push(stations);

        for (quantity, data_type) in declared {
            self.ensure_data_variable(storage, quantity, data_type, &dimensions)?;
        }

        Ok(())
    }

    fn ensure_time_dimension(
        &mut self,
        storage: &mut dyn Storage,
        time_info: &TimeInfo,
    ) -> Result<Dimension> {
        if let Some(dimension) = self.time_dimension_for(time_info) {
            return Ok(dimension.clone());
        }

        self.time_count += 1;
        let name = numbered_name(TIME_VARIABLE_NAME, self.time_count);

        let dimension = storage.add_dimension(&name, time_info.len())?;
        storage.add_variable(&name, DataType::Double, &[name.as_str()])?;
        storage.add_variable_attribute(&name, STANDARD_NAME, TIME_VARIABLE_NAME.into())?;
        storage.add_variable_attribute(&name, LONG_NAME, TIME_VARIABLE_NAME.into())?;
        storage.add_variable_attribute(&name, UNITS, create_time_unit_string().into())?;
        storage.add_variable_attribute(&name, CALENDAR, self.config.calendar.as_str().into())?;
        storage.add_variable_attribute(&name, AXIS, T_AXIS.into())?;

        info!(dimension = %name, count = time_info.len(), "Created time dimension");

        self.time_dimensions.push(TimeDimension {
            time_info: time_info.clone(),
            dimension: dimension.clone(),
        });
        Ok(dimension)
    }

    fn ensure_grid_dimensions(
        &mut self,
        storage: &mut dyn Storage,
        geometry: &GeometryInfo,
    ) -> Result<Vec<Dimension>> {
        if let Some(existing) = self
            .grids
            .iter()
            .find(|grid| grid.geometry.same_geometry(geometry))
        {
            return Ok(existing.dimensions.clone());
        }

        let properties = match geometry.kind() {
            GeometryKind::Irregular(grid) => {
                self.face_count += 1;
                let name = numbered_name(FACE_DIMENSION_NAME, self.face_count);
                let face = storage.add_dimension(&name, grid.cell_count)?;
                info!(dimension = %name, cells = grid.cell_count, "Created face dimension");

                GridVariableProperties {
                    geometry: geometry.clone(),
                    dimensions: vec![face],
                    y_variable: None,
                    x_variable: None,
                }
            }
            GeometryKind::Array(grid) => {
                self.grid_count += 1;
                let y_name = numbered_name(Y_VARIABLE_NAME, self.grid_count);
                let x_name = numbered_name(X_VARIABLE_NAME, self.grid_count);
                let y = storage.add_dimension(&y_name, grid.latitude.len())?;
                let x = storage.add_dimension(&x_name, grid.longitude.len())?;
                info!(
                    y = %y_name,
                    x = %x_name,
                    rows = y.size,
                    columns = x.size,
                    "Created grid dimensions"
                );

                let mut properties = GridVariableProperties {
                    geometry: geometry.clone(),
                    dimensions: vec![y, x],
                    y_variable: None,
                    x_variable: None,
                };

                if let (Some(y_quantity), Some(x_quantity)) =
                    (&grid.latitude.quantity, &grid.longitude.quantity)
                {
                    self.create_coordinate_variable(
                        storage,
                        &y_name,
                        PROJECTION_Y_COORDINATE,
                        y_quantity,
                        Y_AXIS,
                    )?;
                    self.create_coordinate_variable(
                        storage,
                        &x_name,
                        PROJECTION_X_COORDINATE,
                        x_quantity,
                        X_AXIS,
                    )?;
                    properties.y_variable = Some(y_name);
                    properties.x_variable = Some(x_name);
                }

                properties
            }
        };

        let dimensions = properties.dimensions.clone();
        self.grids.push(properties);
        Ok(dimensions)
    }

    /// 1-D coordinate variable named after its own dimension
    fn create_coordinate_variable(
        &self,
        storage: &mut dyn Storage,
        name: &str,
        standard_name: &str,
        quantity: &QuantityInfo,
        axis: &str,
    ) -> Result<()> {
        storage.add_variable(name, DataType::Double, &[name])?;
        storage.add_variable_attribute(name, STANDARD_NAME, standard_name.into())?;
        storage.add_variable_attribute(name, LONG_NAME, quantity.quantity.as_str().into())?;
        storage.add_variable_attribute(name, UNITS, quantity.unit.as_str().into())?;
        storage.add_variable_attribute(name, AXIS, axis.into())?;
        storage.add_variable_attribute(name, FILL_VALUE, self.config.fill_value.into())?;
        Ok(())
    }

    fn create_station_variable(
        &mut self,
        storage: &mut dyn Storage,
        station_count: usize,
    ) -> Result<Dimension> {
        storage.add_dimension(STATION_ID_LENGTH_DIMENSION_NAME, self.config.station_id_width)?;
        let stations = storage.add_dimension(STATION_DIMENSION_NAME, station_count)?;
        storage.add_variable(
            STATION_ID_VARIABLE_NAME,
            DataType::Char,
            &[STATION_DIMENSION_NAME, STATION_ID_LENGTH_DIMENSION_NAME],
        )?;
        storage.add_variable_attribute(
            STATION_ID_VARIABLE_NAME,
            LONG_NAME,
            STATION_ID_LONG_NAME.into(),
        )?;

        info!(stations = station_count, "Created station dimension");
        self.station_dimension = Some(stations.clone());
        Ok(stations)
    }

    fn ensure_data_variable(
        &mut self,
        storage: &mut dyn Storage,
        quantity: &QuantityInfo,
        data_type: DataType,
        dimensions: &[Dimension],
    ) -> Result<()> {
        let name = quantity.quantity.as_str();
        if self.data_variables.iter().any(|existing| existing == name) {
            debug!(variable = name, "Reusing data variable");
            return Ok(());
        }
        if storage.find_variable(name).is_some() {
            return Err(BridgeError::InvalidState {
                message: format!(
                    "cannot create data variable {}, the file already has a variable with that name",
                    name
                ),
            });
        }

        let dimension_names: Vec<&str> = dimensions.iter().map(|dim| dim.name.as_str()).collect();
        storage.add_variable(name, data_type, &dimension_names)?;
        storage.add_variable_attribute(name, LONG_NAME, name.into())?;
        storage.add_variable_attribute(name, UNITS, quantity.unit.as_str().into())?;
        let fill_value = match data_type {
            DataType::Double => AttributeValue::Number(self.config.fill_value),
            DataType::Text | DataType::Char => AttributeValue::Text(String::new()),
        };
        storage.add_variable_attribute(name, FILL_VALUE, fill_value)?;

        info!(
            variable = name,
            dimensions = %dimension_names.join(", "),
            "Created data variable"
        );
        self.data_variables.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{CoordinateArray, Role, VectorExchangeItem};
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;

    fn dimension_names(storage: &MemoryStorage) -> Vec<String> {
        storage.dimensions().iter().map(|dim| dim.name.clone()).collect()
    }

    fn item(quantity: &str, time_info: &TimeInfo) -> VectorExchangeItem {
        VectorExchangeItem::new(quantity, Role::Output, vec![])
            .with_quantity(QuantityInfo::new(quantity, "m"))
            .with_time_info(time_info.clone())
    }

    #[test]
    fn test_same_time_info_creates_one_dimension() {
        let mut storage = MemoryStorage::new();
        let mut session = WriteSession::default();
        let times = TimeInfo::new(vec![1.0, 2.0, 3.0]);

        session.ensure_metadata(&mut storage, &item("a", &times)).unwrap();
        session.ensure_metadata(&mut storage, &item("b", &times)).unwrap();
        session.ensure_metadata(&mut storage, &item("a", &times)).unwrap();

        assert_eq!(dimension_names(&storage), vec!["time"]);
        assert_eq!(session.data_variables(), &["a".to_string(), "b".to_string()]);
        assert_eq!(storage.find_variable("a").unwrap().shape(), vec![3]);
    }

    #[test]
    fn test_distinct_time_infos_are_numbered() {
        let mut storage = MemoryStorage::new();
        let mut session = WriteSession::default();

        for (index, quantity) in ["a", "b", "c"].iter().enumerate() {
            // equal values, distinct objects
            let times = TimeInfo::new(vec![1.0; index + 1]);
            session.ensure_metadata(&mut storage, &item(quantity, &times)).unwrap();
        }

        assert_eq!(dimension_names(&storage), vec!["time", "time2", "time3"]);
        let time2 = storage.find_variable("time2").unwrap();
        assert_eq!(time2.attribute_text(AXIS).as_deref(), Some("T"));
        assert_eq!(time2.attribute_text(CALENDAR).as_deref(), Some("gregorian"));
        assert_eq!(
            time2.units().as_deref(),
            Some("minutes since 1970-01-01 00:00:00.0 +0000")
        );
    }

    #[test]
    fn test_irregular_and_array_geometries() {
        let mut storage = MemoryStorage::new();
        let mut session = WriteSession::default();
        let times = TimeInfo::new(vec![1.0]);
        let faces = GeometryInfo::irregular(4);
        let grid = GeometryInfo::array(
            CoordinateArray::new(vec![50.0, 51.0])
                .with_quantity(QuantityInfo::new("latitude", "degrees_north")),
            CoordinateArray::new(vec![3.0, 4.0, 5.0])
                .with_quantity(QuantityInfo::new("longitude", "degrees_east")),
        );
        let bare_grid = GeometryInfo::array(
            CoordinateArray::new(vec![1.0]),
            CoordinateArray::new(vec![1.0, 2.0]),
        );

        session
            .ensure_metadata(&mut storage, &item("wl", &times).with_geometry(faces.clone()))
            .unwrap();
        session
            .ensure_metadata(&mut storage, &item("vel", &times).with_geometry(faces))
            .unwrap();
        session
            .ensure_metadata(&mut storage, &item("h", &times).with_geometry(grid))
            .unwrap();
        session
            .ensure_metadata(&mut storage, &item("u", &times).with_geometry(bare_grid))
            .unwrap();

        assert_eq!(
            dimension_names(&storage),
            vec!["time", "n_face", "y", "x", "y2", "x2"]
        );
        assert_eq!(storage.find_variable("vel").unwrap().shape(), vec![1, 4]);
        assert_eq!(storage.find_variable("h").unwrap().shape(), vec![1, 2, 3]);

        let y = storage.find_variable("y").unwrap();
        assert_eq!(
            y.attribute_text(STANDARD_NAME).as_deref(),
            Some("projection_y_coordinate")
        );
        assert_eq!(y.units().as_deref(), Some("degrees_north"));
        assert!(storage.find_variable("y2").is_none());

        assert_eq!(session.grids()[1].y_variable.as_deref(), Some("y"));
        assert_eq!(session.grids()[2].x_variable, None);
    }

    #[test]
    fn test_shared_array_geometry_creates_one_grid() {
        let mut storage = MemoryStorage::new();
        let mut session = WriteSession::default();
        let times = TimeInfo::new(vec![1.0, 2.0]);
        let grid = GeometryInfo::array(
            CoordinateArray::new(vec![50.0, 51.0]),
            CoordinateArray::new(vec![3.0, 4.0, 5.0]),
        );

        session
            .ensure_metadata(&mut storage, &item("u", &times).with_geometry(grid.clone()))
            .unwrap();
        session
            .ensure_metadata(&mut storage, &item("v", &times).with_geometry(grid))
            .unwrap();

        assert_eq!(dimension_names(&storage), vec!["time", "y", "x"]);
        assert_eq!(session.grids().len(), 1);
        assert_eq!(storage.find_variable("u").unwrap().shape(), vec![2, 2, 3]);
        assert_eq!(storage.find_variable("v").unwrap().shape(), vec![2, 2, 3]);
    }

    #[test]
    fn test_data_variable_attributes() {
        let mut storage = MemoryStorage::new();
        let mut session = WriteSession::default();
        let text = VectorExchangeItem::new("label", Role::Output, vec![])
            .with_quantity(QuantityInfo::new("label", "-"))
            .with_value_type(ValueType::Text);

        session
            .ensure_metadata(&mut storage, &item("wl", &TimeInfo::new(vec![0.0])))
            .unwrap();
        session.ensure_metadata(&mut storage, &text).unwrap();

        let wl = storage.find_variable("wl").unwrap();
        assert_eq!(wl.attribute_text(LONG_NAME).as_deref(), Some("wl"));
        assert_eq!(wl.units().as_deref(), Some("m"));
        assert_eq!(wl.attribute_number(FILL_VALUE), Some(9.96921e36));
        assert_eq!(storage.find_variable("label").unwrap().data_type, DataType::Text);
    }

    #[test]
    fn test_configuration_errors() {
        let mut storage = MemoryStorage::new();
        let mut session = WriteSession::default();

        let no_quantity = VectorExchangeItem::new("x", Role::Output, vec![]);
        let result = session.ensure_metadata(&mut storage, &no_quantity);
        assert!(matches!(result, Err(BridgeError::MissingQuantity { .. })));

        let odd = VectorExchangeItem::new("x", Role::Output, vec![])
            .with_quantity(QuantityInfo::new("x", "-"))
            .with_value_type(ValueType::Other("boolean".to_string()));
        let result = session.ensure_metadata(&mut storage, &odd);
        assert!(matches!(result, Err(BridgeError::UnsupportedValueType { .. })));

        // nothing was declared
        assert!(storage.dimensions().is_empty());
        assert!(storage.variables().is_empty());
    }

    #[test]
    fn test_scalar_metadata() {
        let mut storage = MemoryStorage::new();
        let mut session = WriteSession::default();
        let times = TimeInfo::new(vec![1.0, 2.0]);
        let items = [
            item("den_helder.waterlevel", &times).with_quantity(QuantityInfo::new("waterlevel", "m")),
            item("vlissingen.waterlevel", &times).with_quantity(QuantityInfo::new("waterlevel", "m")),
            item("den_helder.discharge", &times).with_quantity(QuantityInfo::new("discharge", "m3/s")),
        ];
        let refs: Vec<&dyn ExchangeItem> = items.iter().map(|i| i as &dyn ExchangeItem).collect();

        session.ensure_scalar_metadata(&mut storage, &refs).unwrap();

        assert_eq!(session.station_ids(), &["den_helder".to_string(), "vlissingen".to_string()]);
        assert_eq!(
            dimension_names(&storage),
            vec!["time", "char_leng_id", "stations"]
        );
        assert_eq!(storage.find_variable("waterlevel").unwrap().shape(), vec![2, 2]);
        assert_eq!(storage.find_variable("discharge").unwrap().shape(), vec![2, 2]);
        let station_id = storage.find_variable("station_id").unwrap();
        assert_eq!(station_id.shape(), vec![2, 30]);
        assert_eq!(
            station_id.attribute_text(LONG_NAME).as_deref(),
            Some("station identification code")
        );

        // same batch again declares nothing new
        session.ensure_scalar_metadata(&mut storage, &refs).unwrap();
        assert_eq!(storage.dimensions().len(), 3);
    }

    #[test]
    fn test_station_id_for() {
        assert_eq!(station_id_for("loc1.waterlevel", "waterlevel"), "loc1");
        assert_eq!(station_id_for("a.b.waterlevel", "waterlevel"), "a.b");
        assert_eq!(station_id_for("waterlevel", "waterlevel"), "waterlevel");
        assert_eq!(station_id_for("loc1.discharge", "waterlevel"), "loc1.discharge");
    }
}
