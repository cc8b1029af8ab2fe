//! In-memory storage backend.
//!
//! Numeric variables live in `ndarray` arrays, text variables in plain string
//! vectors. Newly declared numeric variables start out filled with the NetCDF
//! default fill value for doubles, the same way a freshly created NetCDF file
//! behaves.

use ndarray::{ArrayD, IxDyn, Slice};
use std::collections::HashMap;
use tracing::debug;

use super::{AttributeValue, DataType, Dimension, Storage, Variable};
use crate::convention::DEFAULT_FILL_VALUE;
use crate::error::{BridgeError, Result};

/// Array store kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    dimensions: Vec<Dimension>,
    variables: Vec<Variable>,
    numeric: HashMap<String, ArrayD<f64>>,
    text: HashMap<String, Vec<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// All dimensions in declaration order
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    fn variable_ref(&self, name: &str) -> Result<&Variable> {
        self.variables
            .iter()
            .find(|var| var.name == name)
            .ok_or_else(|| BridgeError::storage(format!("Variable not found: {}", name)))
    }

    fn variable_mut(&mut self, name: &str) -> Result<&mut Variable> {
        self.variables
            .iter_mut()
            .find(|var| var.name == name)
            .ok_or_else(|| BridgeError::storage(format!("Variable not found: {}", name)))
    }

    /// Number of text rows a variable holds: all dimensions but the last for
    /// char arrays, every element for string variables.
    fn text_rows(variable: &Variable) -> usize {
        match variable.data_type {
            DataType::Char => variable
                .dimensions
                .iter()
                .take(variable.dimensions.len().saturating_sub(1))
                .map(|dim| dim.size)
                .product(),
            _ => variable.len(),
        }
    }

    fn check_window(variable: &Variable, origin: &[usize], size: &[usize]) -> Result<()> {
        let shape = variable.shape();
        if origin.len() != shape.len() || size.len() != shape.len() {
            return Err(BridgeError::storage(format!(
                "Window rank mismatch for variable {}: variable has {} dimensions, origin has {}, size has {}",
                variable.name,
                shape.len(),
                origin.len(),
                size.len()
            )));
        }

        for (d, &extent) in shape.iter().enumerate() {
            let end = origin[d].checked_add(size[d]);
            if end.map_or(true, |end| end > extent) {
                return Err(BridgeError::storage(format!(
                    "Window out of range for variable {} dimension {}: origin {} + size {} exceeds length {}",
                    variable.name, d, origin[d], size[d], extent
                )));
            }
        }

        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn find_variable(&self, name: &str) -> Option<Variable> {
        self.variables.iter().find(|var| var.name == name).cloned()
    }

    fn find_dimension(&self, name: &str) -> Option<Dimension> {
        self.dimensions.iter().find(|dim| dim.name == name).cloned()
    }

    fn variables(&self) -> Vec<Variable> {
        self.variables.clone()
    }

    fn read(&self, variable: &str, origin: &[usize], size: &[usize]) -> Result<Vec<f64>> {
        let var = self.variable_ref(variable)?;
        Self::check_window(var, origin, size)?;

        let array = self.numeric.get(variable).ok_or_else(|| {
            BridgeError::storage(format!("Variable {} does not hold numeric data", variable))
        })?;

        let view = array.slice_each_axis(|axis| {
            let d = axis.axis.index();
            Slice::from(origin[d]..origin[d] + size[d])
        });

        Ok(view.iter().copied().collect())
    }

    fn write(
        &mut self,
        variable: &str,
        origin: &[usize],
        size: &[usize],
        values: &[f64],
    ) -> Result<()> {
        let var = self.variable_ref(variable)?;
        Self::check_window(var, origin, size)?;

        let array = self.numeric.get_mut(variable).ok_or_else(|| {
            BridgeError::storage(format!("Variable {} does not hold numeric data", variable))
        })?;

        let mut view = array.slice_each_axis_mut(|axis| {
            let d = axis.axis.index();
            Slice::from(origin[d]..origin[d] + size[d])
        });

        if view.len() != values.len() {
            return Err(BridgeError::storage(format!(
                "Cannot write {} values into a window of {} elements of variable {}",
                values.len(),
                view.len(),
                variable
            )));
        }

        view.iter_mut()
            .zip(values)
            .for_each(|(target, value)| *target = *value);

        Ok(())
    }

    fn add_dimension(&mut self, name: &str, size: usize) -> Result<Dimension> {
        if self.find_dimension(name).is_some() {
            return Err(BridgeError::storage(format!(
                "Dimension already exists: {}",
                name
            )));
        }

        let dimension = Dimension::new(name, size);
        self.dimensions.push(dimension.clone());
        debug!(dimension = name, size = size, "Added dimension");
        Ok(dimension)
    }

    fn add_variable(&mut self, name: &str, data_type: DataType, dimensions: &[&str]) -> Result<()> {
        if self.find_variable(name).is_some() {
            return Err(BridgeError::storage(format!("Variable already exists: {}", name)));
        }

        let dims = dimensions
            .iter()
            .map(|dim_name| {
                self.find_dimension(dim_name).ok_or_else(|| {
                    BridgeError::storage(format!(
                        "Variable {} references non-existent dimension {}",
                        name, dim_name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if data_type == DataType::Char && dims.is_empty() {
            return Err(BridgeError::storage(format!(
                "Char variable {} needs at least one dimension for its width",
                name
            )));
        }

        let variable = Variable::new(name, data_type, dims);
        match data_type {
            DataType::Double => {
                let array = ArrayD::from_elem(IxDyn(&variable.shape()), DEFAULT_FILL_VALUE);
                self.numeric.insert(name.to_string(), array);
            }
            DataType::Text | DataType::Char => {
                let rows = Self::text_rows(&variable);
                self.text.insert(name.to_string(), vec![String::new(); rows]);
            }
        }

        debug!(variable = name, data_type = ?data_type, "Added variable");
        self.variables.push(variable);
        Ok(())
    }

    fn add_variable_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: AttributeValue,
    ) -> Result<()> {
        let var = self.variable_mut(variable)?;
        var.attributes.insert(name.to_string(), value);
        Ok(())
    }

    fn read_text(&self, variable: &str) -> Result<Vec<String>> {
        self.variable_ref(variable)?;
        self.text.get(variable).cloned().ok_or_else(|| {
            BridgeError::storage(format!("Variable {} does not hold text data", variable))
        })
    }

    fn write_text(&mut self, variable: &str, values: &[String]) -> Result<()> {
        let var = self.variable_ref(variable)?;
        let rows = Self::text_rows(var);
        let width = match var.data_type {
            DataType::Char => var.dimensions.last().map(|dim| dim.size),
            _ => None,
        };

        if values.len() != rows {
            return Err(BridgeError::storage(format!(
                "Cannot write {} strings into text variable {} with {} entries",
                values.len(),
                variable,
                rows
            )));
        }

        if let Some(width) = width {
            if let Some(too_long) = values.iter().find(|value| value.chars().count() > width) {
                return Err(BridgeError::storage(format!(
                    "String '{}' does not fit in {} characters of variable {}",
                    too_long, width, variable
                )));
            }
        }

        let target = self.text.get_mut(variable).ok_or_else(|| {
            BridgeError::storage(format!("Variable {} does not hold text data", variable))
        })?;
        target.clone_from_slice(values);
        Ok(())
    }
}
