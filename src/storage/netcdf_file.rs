//! NetCDF storage backend.
//!
//! Wraps a file opened through the `netcdf` crate. Numeric variables of any
//! basic type are read and written as doubles, the library converting on the
//! way. String variables map to [`DataType::Text`], char arrays to
//! [`DataType::Char`].

use netcdf::types::{BasicType, VariableType};
use netcdf::{Attribute, Extent};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{AttributeValue, DataType, Dimension, Storage, Variable};
use crate::error::{BridgeError, Result};

enum Handle {
    ReadOnly(netcdf::File),
    Writable(netcdf::FileMut),
}

/// A NetCDF file behind the [`Storage`] interface
pub struct NetcdfStorage {
    path: PathBuf,
    handle: Handle,
}

impl NetcdfStorage {
    /// Open an existing file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = netcdf::open(path)?;
        info!(path = %path.display(), "Opened NetCDF file");
        Ok(Self {
            path: path.to_path_buf(),
            handle: Handle::ReadOnly(file),
        })
    }

    /// Open an existing file for reading and writing
    pub fn append(path: &Path) -> Result<Self> {
        let file = netcdf::append(path)?;
        info!(path = %path.display(), "Opened NetCDF file for appending");
        Ok(Self {
            path: path.to_path_buf(),
            handle: Handle::Writable(file),
        })
    }

    /// Create a new file, replacing any existing one
    pub fn create(path: &Path) -> Result<Self> {
        let file = netcdf::create(path)?;
        info!(path = %path.display(), "Created NetCDF file");
        Ok(Self {
            path: path.to_path_buf(),
            handle: Handle::Writable(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> &netcdf::File {
        match &self.handle {
            Handle::ReadOnly(file) => file,
            Handle::Writable(file) => file,
        }
    }

    fn file_mut(&mut self) -> Result<&mut netcdf::FileMut> {
        match &mut self.handle {
            Handle::Writable(file) => Ok(file),
            Handle::ReadOnly(_) => Err(BridgeError::storage(format!(
                "File {} is opened read-only",
                self.path.display()
            ))),
        }
    }

    fn nc_variable(&self, name: &str) -> Result<netcdf::Variable<'_>> {
        self.file()
            .variable(name)
            .ok_or_else(|| BridgeError::storage(format!("Variable not found: {}", name)))
    }

    fn nc_variable_mut(&mut self, name: &str) -> Result<netcdf::VariableMut<'_>> {
        self.file_mut()?
            .variable_mut(name)
            .ok_or_else(|| BridgeError::storage(format!("Variable not found: {}", name)))
    }
}

/// Convert a NetCDF attribute to our AttributeValue enum
fn convert_attribute(attr: &Attribute) -> Result<AttributeValue> {
    use netcdf::AttributeValue as NcAttributeValue;

    let value = attr.value()?;

    match value {
        NcAttributeValue::Str(s) => Ok(AttributeValue::Text(s)),
        NcAttributeValue::Strs(s) => Ok(AttributeValue::Text(s.join(" "))),

        NcAttributeValue::Uchar(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Schar(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Short(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Int(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Float(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Double(v) => Ok(AttributeValue::Number(v)),

        NcAttributeValue::Shorts(v) => Ok(number_array(v.into_iter().map(f64::from))),
        NcAttributeValue::Ints(v) => Ok(number_array(v.into_iter().map(f64::from))),
        NcAttributeValue::Floats(v) => Ok(number_array(v.into_iter().map(f64::from))),
        NcAttributeValue::Doubles(v) => Ok(number_array(v.into_iter())),

        other => Ok(AttributeValue::Text(format!("{:?}", other))),
    }
}

/// Single-element arrays collapse to a plain number
fn number_array(values: impl Iterator<Item = f64>) -> AttributeValue {
    let values: Vec<f64> = values.collect();
    match values.as_slice() {
        [value] => AttributeValue::Number(*value),
        _ => AttributeValue::NumberArray(values),
    }
}

fn data_type_of(var: &netcdf::Variable) -> DataType {
    match var.vartype() {
        VariableType::String => DataType::Text,
        VariableType::Basic(BasicType::Char) => DataType::Char,
        _ => DataType::Double,
    }
}

fn convert_variable(var: &netcdf::Variable) -> Result<Variable> {
    let dimensions = var
        .dimensions()
        .iter()
        .map(|dim| Dimension::new(dim.name(), dim.len()))
        .collect();

    let mut variable = Variable::new(var.name(), data_type_of(var), dimensions);
    for attr in var.attributes() {
        variable
            .attributes
            .insert(attr.name().to_string(), convert_attribute(&attr)?);
    }
    Ok(variable)
}

fn extents(origin: &[usize], size: &[usize]) -> Vec<Extent> {
    origin
        .iter()
        .zip(size)
        .map(|(&start, &count)| (start..start + count).into())
        .collect()
}

/// Row-major multi-index of element `flat` in an array of `shape`
fn unravel(mut flat: usize, shape: &[usize]) -> Vec<Extent> {
    let mut index = vec![0; shape.len()];
    for (d, &extent) in shape.iter().enumerate().rev() {
        if extent > 0 {
            index[d] = flat % extent;
            flat /= extent;
        }
    }
    index.into_iter().map(Extent::from).collect()
}

fn check_rank(variable: &str, rank: usize, origin: &[usize], size: &[usize]) -> Result<()> {
    if origin.len() != rank || size.len() != rank {
        return Err(BridgeError::storage(format!(
            "Window rank mismatch for variable {}: variable has {} dimensions, origin has {}, size has {}",
            variable,
            rank,
            origin.len(),
            size.len()
        )));
    }
    Ok(())
}

impl Storage for NetcdfStorage {
    fn find_variable(&self, name: &str) -> Option<Variable> {
        let var = self.file().variable(name)?;
        match convert_variable(&var) {
            Ok(variable) => Some(variable),
            Err(e) => {
                warn!(variable = name, error = %e, "Could not read variable metadata");
                None
            }
        }
    }

    fn find_dimension(&self, name: &str) -> Option<Dimension> {
        self.file()
            .dimension(name)
            .map(|dim| Dimension::new(dim.name(), dim.len()))
    }

    fn variables(&self) -> Vec<Variable> {
        self.file()
            .variables()
            .filter_map(|var| match convert_variable(&var) {
                Ok(variable) => Some(variable),
                Err(e) => {
                    warn!(variable = %var.name(), error = %e, "Skipping variable");
                    None
                }
            })
            .collect()
    }

    fn read(&self, variable: &str, origin: &[usize], size: &[usize]) -> Result<Vec<f64>> {
        let var = self.nc_variable(variable)?;
        check_rank(variable, var.dimensions().len(), origin, size)?;
        if size.iter().any(|&count| count == 0) {
            return Ok(Vec::new());
        }
        Ok(var.get_values::<f64, _>(extents(origin, size))?)
    }

    fn write(
        &mut self,
        variable: &str,
        origin: &[usize],
        size: &[usize],
        values: &[f64],
    ) -> Result<()> {
        let mut var = self.nc_variable_mut(variable)?;
        check_rank(variable, var.dimensions().len(), origin, size)?;
        let count: usize = size.iter().product();
        if count != values.len() {
            return Err(BridgeError::storage(format!(
                "Cannot write {} values into a window of {} elements of variable {}",
                values.len(),
                count,
                variable
            )));
        }
        var.put_values(values, extents(origin, size))?;
        Ok(())
    }

    fn add_dimension(&mut self, name: &str, size: usize) -> Result<Dimension> {
        let dim = self.file_mut()?.add_dimension(name, size)?;
        debug!(dimension = name, size = size, "Added dimension");
        Ok(Dimension::new(dim.name(), dim.len()))
    }

    fn add_variable(&mut self, name: &str, data_type: DataType, dimensions: &[&str]) -> Result<()> {
        let file = self.file_mut()?;
        match data_type {
            DataType::Double => {
                file.add_variable::<f64>(name, dimensions)?;
            }
            DataType::Text => {
                file.add_string_variable(name, dimensions)?;
            }
            DataType::Char => {
                file.add_variable_with_type(
                    name,
                    dimensions,
                    &VariableType::Basic(BasicType::Char),
                )?;
            }
        }
        debug!(variable = name, data_type = ?data_type, "Added variable");
        Ok(())
    }

    fn add_variable_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: AttributeValue,
    ) -> Result<()> {
        let mut var = self.nc_variable_mut(variable)?;
        match value {
            AttributeValue::Text(text) => var.put_attribute(name, text.as_str())?,
            AttributeValue::Number(number) => var.put_attribute(name, number)?,
            AttributeValue::NumberArray(numbers) => var.put_attribute(name, numbers)?,
        };
        Ok(())
    }

    fn read_text(&self, variable: &str) -> Result<Vec<String>> {
        let var = self.nc_variable(variable)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|dim| dim.len()).collect();

        match data_type_of(&var) {
            DataType::Text => {
                let count: usize = shape.iter().product();
                (0..count)
                    .map(|flat| {
                        var.get_string(unravel(flat, &shape))
                            .map_err(BridgeError::from)
                    })
                    .collect()
            }
            DataType::Char => {
                let width = shape.last().copied().unwrap_or(0);
                let bytes = var.get_raw_values(extents(&vec![0; shape.len()], &shape))?;
                if width == 0 {
                    return Ok(Vec::new());
                }
                Ok(bytes
                    .chunks(width)
                    .map(|row| {
                        let end = row.iter().position(|&b| b == 0).unwrap_or(row.len());
                        String::from_utf8_lossy(&row[..end]).into_owned()
                    })
                    .collect())
            }
            DataType::Double => Err(BridgeError::storage(format!(
                "Variable {} does not hold text data",
                variable
            ))),
        }
    }

    fn write_text(&mut self, variable: &str, values: &[String]) -> Result<()> {
        let mut var = self.nc_variable_mut(variable)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|dim| dim.len()).collect();

        match data_type_of(&var) {
            DataType::Text => {
                let count: usize = shape.iter().product();
                if values.len() != count {
                    return Err(BridgeError::storage(format!(
                        "Cannot write {} strings into text variable {} with {} entries",
                        values.len(),
                        variable,
                        count
                    )));
                }
                for (flat, value) in values.iter().enumerate() {
                    var.put_string(value, unravel(flat, &shape))?;
                }
                Ok(())
            }
            DataType::Char => {
                let width = shape.last().copied().unwrap_or(0);
                let rows: usize = shape[..shape.len().saturating_sub(1)].iter().product();
                if values.len() != rows {
                    return Err(BridgeError::storage(format!(
                        "Cannot write {} strings into text variable {} with {} entries",
                        values.len(),
                        variable,
                        rows
                    )));
                }

                let mut bytes = vec![0u8; rows * width];
                for (row, value) in values.iter().enumerate() {
                    let encoded = value.as_bytes();
                    if encoded.len() > width {
                        return Err(BridgeError::storage(format!(
                            "String '{}' does not fit in {} characters of variable {}",
                            value, width, variable
                        )));
                    }
                    bytes[row * width..row * width + encoded.len()].copy_from_slice(encoded);
                }
                var.put_raw_values(&bytes, extents(&vec![0; shape.len()], &shape))?;
                Ok(())
            }
            DataType::Double => Err(BridgeError::storage(format!(
                "Variable {} does not hold text data",
                variable
            ))),
        }
    }
}
