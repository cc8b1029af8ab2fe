//! Conversion between raw stored numbers and semantic values.
//!
//! Reading follows the CF rules for missing data and packed data: a value is
//! first checked against the fill value and only valid values are scaled and
//! offset. Writing only maps NaN back to the fill value; values are expected
//! to be packed by the caller already (see [`Packing::pack`] for the inverse
//! transform).

use std::borrow::Cow;

use crate::convention::{ADD_OFFSET, FILL_VALUE, MISSING_VALUE, SCALE_FACTOR};
use crate::storage::Variable;

/// Missing-value and packing attributes of one variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packing {
    pub fill_value: f64,
    pub scale_factor: f64,
    pub add_offset: f64,
}

impl Default for Packing {
    fn default() -> Self {
        Self {
            fill_value: f64::NAN,
            scale_factor: 1.0,
            add_offset: 0.0,
        }
    }
}

impl Packing {
    pub fn new(fill_value: f64, scale_factor: f64, add_offset: f64) -> Self {
        Self {
            fill_value,
            scale_factor,
            add_offset,
        }
    }

    /// Read `_FillValue` (else `missing_value`, else NaN), `scale_factor`
    /// (else 1) and `add_offset` (else 0) from a variable.
    pub fn from_variable(variable: &Variable) -> Self {
        let fill_value = variable
            .attribute_number(FILL_VALUE)
            .or_else(|| variable.attribute_number(MISSING_VALUE))
            .unwrap_or(f64::NAN);

        Self {
            fill_value,
            scale_factor: variable.attribute_number(SCALE_FACTOR).unwrap_or(1.0),
            add_offset: variable.attribute_number(ADD_OFFSET).unwrap_or(0.0),
        }
    }

    pub fn decode(&self, values: &mut [f64]) {
        decode_in_place(values, self.fill_value, self.scale_factor, self.add_offset);
    }

    pub fn encode<'a>(&self, values: &'a [f64]) -> Cow<'a, [f64]> {
        encode(values, self.fill_value)
    }

    /// Full inverse of [`Packing::decode`]: NaN becomes the fill value, every
    /// other value is unscaled as `(value - add_offset) / scale_factor`.
    pub fn pack(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .map(|&value| {
                if value.is_nan() {
                    self.fill_value
                } else if self.scale_factor == 1.0 && self.add_offset == 0.0 {
                    value
                } else {
                    (value - self.add_offset) / self.scale_factor
                }
            })
            .collect()
    }
}

/// True when `value` is the fill value. NaN matches a NaN fill value and
/// otherwise the comparison is on the bit pattern, so `-0.0` and `0.0` differ.
fn is_fill(value: f64, fill_value: f64) -> bool {
    value.to_bits() == fill_value.to_bits() || (value.is_nan() && fill_value.is_nan())
}

/// Replace fill values with NaN and apply `value * scale + offset` to the
/// rest, in place.
pub fn decode_in_place(values: &mut [f64], fill_value: f64, scale_factor: f64, add_offset: f64) {
    if scale_factor == 1.0 && add_offset == 0.0 {
        // a NaN fill value already reads as NaN
        if fill_value.is_nan() {
            return;
        }
        for value in values.iter_mut() {
            if is_fill(*value, fill_value) {
                *value = f64::NAN;
            }
        }
    } else {
        for value in values.iter_mut() {
            if is_fill(*value, fill_value) {
                *value = f64::NAN;
            } else {
                *value = *value * scale_factor + add_offset;
            }
        }
    }
}

/// Owned variant of [`decode_in_place`]
pub fn decode(mut values: Vec<f64>, fill_value: f64, scale_factor: f64, add_offset: f64) -> Vec<f64> {
    decode_in_place(&mut values, fill_value, scale_factor, add_offset);
    values
}

/// Replace NaN with the fill value. With a NaN fill value the input is
/// returned untouched.
pub fn encode(values: &[f64], fill_value: f64) -> Cow<'_, [f64]> {
    if fill_value.is_nan() || !values.iter().any(|value| value.is_nan()) {
        return Cow::Borrowed(values);
    }

    Cow::Owned(
        values
            .iter()
            .map(|&value| if value.is_nan() { fill_value } else { value })
            .collect(),
    )
}
