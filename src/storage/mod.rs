//! Storage collaborator for the bridge.
//!
//! The bridge never talks to a file format directly. Everything it needs from
//! the underlying array store goes through the [`Storage`] trait: finding
//! variables, reading and writing hyper-rectangular windows, and declaring
//! dimensions, variables and attributes.

pub mod memory;
#[cfg(feature = "netcdf")]
pub mod netcdf_file;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

pub use memory::MemoryStorage;
#[cfg(feature = "netcdf")]
pub use netcdf_file::NetcdfStorage;

/// Metadata about a dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Name of the dimension
    pub name: String,
    /// Size of the dimension
    pub size: usize,
}

impl Dimension {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Possible attribute values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String attribute
    Text(String),
    /// Numeric attribute (stored as f64 for simplicity)
    Number(f64),
    /// Array of numbers
    NumberArray(Vec<f64>),
}

impl AttributeValue {
    /// Attribute as a string. Numbers are rendered, arrays are not.
    pub fn as_text(&self) -> Option<String> {
        match self {
            AttributeValue::Text(text) => Some(text.clone()),
            AttributeValue::Number(value) => Some(value.to_string()),
            AttributeValue::NumberArray(_) => None,
        }
    }

    /// Attribute as a number. Arrays yield their first element.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(value) => Some(*value),
            AttributeValue::NumberArray(values) => values.first().copied(),
            AttributeValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

/// Element type of a stored variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit floating point
    Double,
    /// Variable-length string per element
    Text,
    /// Fixed-width character array, the last dimension is the width
    Char,
}

/// Metadata about a stored variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Name of the variable
    pub name: String,
    /// Dimensions of the variable, in declaration order
    pub dimensions: Vec<Dimension>,
    /// Variable attributes
    pub attributes: HashMap<String, AttributeValue>,
    /// Element type
    pub data_type: DataType,
}

impl Variable {
    pub fn new(name: impl Into<String>, data_type: DataType, dimensions: Vec<Dimension>) -> Self {
        Self {
            name: name.into(),
            dimensions,
            attributes: HashMap::new(),
            data_type,
        }
    }

    /// Shape of the variable (dimension sizes)
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(|dim| dim.size).collect()
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.dimensions.iter().map(|dim| dim.size).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the dimension with the given name
    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|dim| dim.name == name)
    }

    /// A coordinate variable is one-dimensional and named after its dimension
    pub fn is_coordinate_variable(&self) -> bool {
        self.dimensions.len() == 1 && self.dimensions[0].name == self.name
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Trimmed string value of an attribute
    pub fn attribute_text(&self, name: &str) -> Option<String> {
        self.attributes
            .get(name)
            .and_then(AttributeValue::as_text)
            .map(|text| text.trim().to_string())
    }

    pub fn attribute_number(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(AttributeValue::as_number)
    }

    /// Trimmed `units` attribute
    pub fn units(&self) -> Option<String> {
        self.attribute_text(crate::convention::UNITS)
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }
}

/// The narrow interface the bridge needs from an array store.
///
/// Numeric windows are exchanged as flat row-major `f64` buffers whose length
/// is the product of `size`. Implementations must reject windows that do not
/// fit the variable's shape; the bridge never retries and never clamps.
pub trait Storage {
    /// Look up a variable by name
    fn find_variable(&self, name: &str) -> Option<Variable>;

    /// Look up a dimension by name
    fn find_dimension(&self, name: &str) -> Option<Dimension>;

    /// All variables in declaration order
    fn variables(&self) -> Vec<Variable>;

    /// Read the raw values of a window
    fn read(&self, variable: &str, origin: &[usize], size: &[usize]) -> Result<Vec<f64>>;

    /// Write raw values into a window
    fn write(&mut self, variable: &str, origin: &[usize], size: &[usize], values: &[f64])
        -> Result<()>;

    /// Declare a new dimension
    fn add_dimension(&mut self, name: &str, size: usize) -> Result<Dimension>;

    /// Declare a new variable over existing dimensions
    fn add_variable(&mut self, name: &str, data_type: DataType, dimensions: &[&str]) -> Result<()>;

    /// Attach an attribute to an existing variable
    fn add_variable_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: AttributeValue,
    ) -> Result<()>;

    /// Read a text variable. Scalar text yields one entry, char arrays one
    /// entry per row of the leading dimensions.
    fn read_text(&self, variable: &str) -> Result<Vec<String>>;

    /// Write a text variable, one entry per element (or per row for char arrays)
    fn write_text(&mut self, variable: &str, values: &[String]) -> Result<()>;
}
