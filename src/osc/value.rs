//! Casting OSC arguments to track attribute values
//!
//! REAPER sends most values as floats, but other OSC clients (TouchOSC,
//! oscsend, test scripts) happily send ints, strings or booleans, so every
//! cast accepts the reasonable spread of argument types.

use crate::state::{TrackValue, ValueKind};
use rosc::OscType;
use thiserror::Error;

/// Argument could not be converted to the requested kind
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Cannot cast {found} to {expected}")]
pub struct CastError {
    pub expected: ValueKind,
    pub found: String,
}

impl CastError {
    fn new(expected: ValueKind, arg: &OscType) -> Self {
        Self {
            expected,
            found: format!("{:?}", arg),
        }
    }
}

/// Cast `arg` to a value of `kind`
pub fn cast(kind: ValueKind, arg: &OscType) -> Result<TrackValue, CastError> {
    match kind {
        ValueKind::Float => to_float(arg).map(TrackValue::Float),
        ValueKind::Bool => to_bool(arg).map(TrackValue::Bool),
        ValueKind::Text => to_text(arg).map(TrackValue::Text),
    }
}

fn to_float(arg: &OscType) -> Result<f64, CastError> {
    let value = match arg {
        OscType::Float(v) => f64::from(*v),
        OscType::Double(v) => *v,
        OscType::Int(v) => f64::from(*v),
        OscType::Long(v) => *v as f64,
        OscType::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        OscType::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| CastError::new(ValueKind::Float, arg))?,
        _ => return Err(CastError::new(ValueKind::Float, arg)),
    };
    Ok(value)
}

fn to_bool(arg: &OscType) -> Result<bool, CastError> {
    let value = match arg {
        OscType::Bool(b) => *b,
        OscType::Int(v) => *v != 0,
        OscType::Long(v) => *v != 0,
        OscType::Float(v) => *v != 0.0,
        OscType::Double(v) => *v != 0.0,
        OscType::Nil => false,
        OscType::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => true,
            "0" | "false" | "off" | "no" | "" => false,
            _ => return Err(CastError::new(ValueKind::Bool, arg)),
        },
        _ => return Err(CastError::new(ValueKind::Bool, arg)),
    };
    Ok(value)
}

fn to_text(arg: &OscType) -> Result<String, CastError> {
    let value = match arg {
        OscType::String(s) => s.clone(),
        OscType::Char(c) => c.to_string(),
        OscType::Int(v) => v.to_string(),
        OscType::Long(v) => v.to_string(),
        OscType::Float(v) => v.to_string(),
        OscType::Double(v) => v.to_string(),
        OscType::Bool(b) => b.to_string(),
        _ => return Err(CastError::new(ValueKind::Text, arg)),
    };
    Ok(value)
}
