//! Exchange item data model.
//!
//! An exchange item is a named physical quantity crossing the boundary between
//! a model and the bridge. Its time axis and geometry are shared objects: two
//! items refer to the "same" axis only when they hold the same [`TimeInfo`] or
//! [`GeometryInfo`] instance (or a clone of it). Every instance gets an opaque
//! key at construction and that key, not the values, decides identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{BridgeError, Result};

static NEXT_AXIS_KEY: AtomicU64 = AtomicU64::new(1);

/// Identity of a time axis or geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AxisKey(u64);

impl AxisKey {
    fn next() -> Self {
        AxisKey(NEXT_AXIS_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// Direction in which an item crosses the model boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Input,
    Output,
    InOut,
    Unknown,
}

/// Name and physical unit of a quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityInfo {
    pub quantity: String,
    pub unit: String,
}

impl QuantityInfo {
    pub fn new(quantity: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            quantity: quantity.into(),
            unit: unit.into(),
        }
    }
}

/// Ordered time stamps in MJD. Clones share identity.
#[derive(Debug, Clone)]
pub struct TimeInfo {
    key: AxisKey,
    times: Arc<[f64]>,
}

impl TimeInfo {
    /// New axis with a fresh identity
    pub fn new(times: Vec<f64>) -> Self {
        Self {
            key: AxisKey::next(),
            times: times.into(),
        }
    }

    pub fn key(&self) -> AxisKey {
        self.key
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Whether both refer to the same axis object
    pub fn same_axis(&self, other: &TimeInfo) -> bool {
        self.key == other.key
    }
}

/// Coordinate values of one horizontal axis of a regular array geometry
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateArray {
    /// Decoded coordinate values, row-major
    pub values: Vec<f64>,
    /// Shape of the coordinate variable
    pub shape: Vec<usize>,
    /// For every dimension of the coordinate variable, the index of the same
    /// dimension in the data variable
    pub value_indices: Vec<usize>,
    pub quantity: Option<QuantityInfo>,
}

impl CoordinateArray {
    pub fn new(values: Vec<f64>) -> Self {
        let shape = vec![values.len()];
        Self {
            values,
            shape,
            value_indices: Vec::new(),
            quantity: None,
        }
    }

    pub fn with_quantity(mut self, quantity: QuantityInfo) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_value_indices(mut self, value_indices: Vec<usize>) -> Self {
        self.value_indices = value_indices;
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Grid given by parallel latitude and longitude arrays
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayGeometry {
    pub latitude: CoordinateArray,
    pub longitude: CoordinateArray,
}

/// Grid whose cells are addressed by a flat face index
#[derive(Debug, Clone, PartialEq)]
pub struct IrregularGrid {
    pub cell_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeometryKind {
    Array(ArrayGeometry),
    Irregular(IrregularGrid),
}

/// Spatial layout of an item's values. Clones share identity.
#[derive(Debug, Clone)]
pub struct GeometryInfo {
    key: AxisKey,
    kind: Arc<GeometryKind>,
    active_cells: Option<Arc<[bool]>>,
}

impl GeometryInfo {
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            key: AxisKey::next(),
            kind: Arc::new(kind),
            active_cells: None,
        }
    }

    pub fn array(latitude: CoordinateArray, longitude: CoordinateArray) -> Self {
        Self::new(GeometryKind::Array(ArrayGeometry {
            latitude,
            longitude,
        }))
    }

    pub fn irregular(cell_count: usize) -> Self {
        Self::new(GeometryKind::Irregular(IrregularGrid { cell_count }))
    }

    /// Mark which grid cells are active. Models often only exchange values
    /// for active cells.
    pub fn with_active_cells(mut self, active_cells: Vec<bool>) -> Self {
        self.active_cells = Some(active_cells.into());
        self
    }

    pub fn key(&self) -> AxisKey {
        self.key
    }

    pub fn kind(&self) -> &GeometryKind {
        &self.kind
    }

    pub fn same_geometry(&self, other: &GeometryInfo) -> bool {
        self.key == other.key
    }

    /// Number of grid cells
    pub fn cell_count(&self) -> usize {
        match self.kind.as_ref() {
            GeometryKind::Array(grid) => grid.latitude.len() * grid.longitude.len(),
            GeometryKind::Irregular(grid) => grid.cell_count,
        }
    }

    /// Expand values given for active cells only to the full grid, with NaN
    /// in the inactive cells. Values that already cover the full grid, or a
    /// geometry without an active cell mask, pass through unchanged.
    pub fn add_missing_values_for_inactive_cells(&self, values: Vec<f64>) -> Result<Vec<f64>> {
        let active = match &self.active_cells {
            Some(active) => active,
            None => return Ok(values),
        };
        if values.len() == active.len() {
            return Ok(values);
        }

        let active_count = active.iter().filter(|&&is_active| is_active).count();
        if values.len() != active_count {
            return Err(BridgeError::InvalidParameter {
                param: "values".to_string(),
                message: format!(
                    "got {} values for a grid with {} active of {} cells",
                    values.len(),
                    active_count,
                    active.len()
                ),
            });
        }

        let mut source = values.into_iter();
        Ok(active
            .iter()
            .map(|&is_active| {
                if is_active {
                    source.next().unwrap_or(f64::NAN)
                } else {
                    f64::NAN
                }
            })
            .collect())
    }
}

/// Shape of an item's payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Double,
    Doubles,
    Doubles2d,
    Floats,
    Int,
    Array,
    Vector,
    Text,
    /// Payload kind the bridge does not know how to store
    Other(String),
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Double => write!(f, "double"),
            ValueType::Doubles => write!(f, "doubles"),
            ValueType::Doubles2d => write!(f, "doubles2d"),
            ValueType::Floats => write!(f, "floats"),
            ValueType::Int => write!(f, "int"),
            ValueType::Array => write!(f, "array"),
            ValueType::Vector => write!(f, "vector"),
            ValueType::Text => write!(f, "text"),
            ValueType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A quantity exposed for reading and writing across the model boundary
pub trait ExchangeItem {
    fn id(&self) -> &str;

    fn role(&self) -> Role;

    fn quantity_info(&self) -> Option<&QuantityInfo>;

    fn time_info(&self) -> Option<&TimeInfo>;

    fn geometry_info(&self) -> Option<&GeometryInfo>;

    fn value_type(&self) -> ValueType;

    /// All values of the item as doubles
    fn values_as_doubles(&self) -> Result<Vec<f64>>;
}

/// Exchange item holding its values in memory
#[derive(Debug, Clone)]
pub struct VectorExchangeItem {
    id: String,
    role: Role,
    quantity_info: Option<QuantityInfo>,
    time_info: Option<TimeInfo>,
    geometry_info: Option<GeometryInfo>,
    value_type: ValueType,
    values: Vec<f64>,
}

impl VectorExchangeItem {
    pub fn new(id: impl Into<String>, role: Role, values: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            role,
            quantity_info: None,
            time_info: None,
            geometry_info: None,
            value_type: ValueType::Vector,
            values,
        }
    }

    pub fn with_quantity(mut self, quantity_info: QuantityInfo) -> Self {
        self.quantity_info = Some(quantity_info);
        self
    }

    pub fn with_time_info(mut self, time_info: TimeInfo) -> Self {
        self.time_info = Some(time_info);
        self
    }

    pub fn with_geometry(mut self, geometry_info: GeometryInfo) -> Self {
        self.geometry_info = Some(geometry_info);
        self
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn set_values(&mut self, values: Vec<f64>) {
        self.values = values;
    }
}

impl ExchangeItem for VectorExchangeItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> Role {
        self.role
    }

    fn quantity_info(&self) -> Option<&QuantityInfo> {
        self.quantity_info.as_ref()
    }

    fn time_info(&self) -> Option<&TimeInfo> {
        self.time_info.as_ref()
    }

    fn geometry_info(&self) -> Option<&GeometryInfo> {
        self.geometry_info.as_ref()
    }

    fn value_type(&self) -> ValueType {
        self.value_type.clone()
    }

    fn values_as_doubles(&self) -> Result<Vec<f64>> {
        Ok(self.values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_info_identity() {
        let a = TimeInfo::new(vec![1.0, 2.0]);
        let b = TimeInfo::new(vec![1.0, 2.0]);
        let a2 = a.clone();

        assert!(a.same_axis(&a2));
        assert!(!a.same_axis(&b));
        assert_eq!(a.times(), b.times());
    }

    #[test]
    fn test_geometry_identity_and_cells() {
        let grid = GeometryInfo::array(
            CoordinateArray::new(vec![50.0, 51.0]),
            CoordinateArray::new(vec![3.0, 4.0, 5.0]),
        );
        assert_eq!(grid.cell_count(), 6);
        assert!(grid.same_geometry(&grid.clone()));
        assert!(!grid.same_geometry(&GeometryInfo::irregular(6)));
    }

    #[test]
    fn test_add_missing_values_for_inactive_cells() {
        let grid = GeometryInfo::irregular(4).with_active_cells(vec![true, false, true, false]);
        let values = grid
            .add_missing_values_for_inactive_cells(vec![1.0, 2.0])
            .unwrap();
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 2.0);
        assert!(values[3].is_nan());

        let full = grid
            .add_missing_values_for_inactive_cells(vec![1.0, 2.0, 3.0, 4.0])
            .unwrap();
        assert_eq!(full, vec![1.0, 2.0, 3.0, 4.0]);

        assert!(grid
            .add_missing_values_for_inactive_cells(vec![1.0, 2.0, 3.0])
            .is_err());
    }

    #[test]
    fn test_value_type_display() {
        assert_eq!(ValueType::Vector.to_string(), "vector");
        assert_eq!(ValueType::Other("bool".to_string()).to_string(), "bool");
    }
}
