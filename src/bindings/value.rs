//! Script value model and marshalling between native and script values.

use super::handle::HandleId;
use crate::core::error::{BindingError, BindingResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dynamically typed value crossing the script/native boundary.
///
/// The untagged serde representation doubles as the wire format used by
/// host adapters: `null`, booleans, numbers, strings, and handle objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptValue {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Handle(HandleId),
}

impl ScriptValue {
    /// Script-facing name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Int(_) => "integer",
            ScriptValue::Float(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Handle(_) => "handle",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }
}

impl Default for ScriptValue {
    fn default() -> Self {
        ScriptValue::Nil
    }
}

/// Declared type of a parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    Bool,
    Int,
    Float,
    String,
    Handle,
    Any,
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgType::Bool => "boolean",
            ArgType::Int => "integer",
            ArgType::Float => "number",
            ArgType::String => "string",
            ArgType::Handle => "handle",
            ArgType::Any => "any",
        };
        f.write_str(name)
    }
}

/// Conversion from a script value into a native parameter.
pub trait FromScript: Sized {
    const KIND: ArgType;

    fn from_script(value: &ScriptValue) -> Option<Self>;
}

/// Conversion from a native value into a script value.
pub trait IntoScript {
    const KIND: ArgType;

    fn into_script(self) -> ScriptValue;
}

/// Converts positional argument `index`, treating a missing argument as nil.
pub fn convert_arg<A: FromScript>(args: &[ScriptValue], index: usize) -> BindingResult<A> {
    let value = args.get(index).unwrap_or(&ScriptValue::Nil);
    A::from_script(value).ok_or_else(|| BindingError::ArgumentTypeMismatch {
        index,
        expected: A::KIND,
        found: value.type_name().to_string(),
    })
}

fn integral(value: &ScriptValue) -> Option<i64> {
    match value {
        ScriptValue::Int(i) => Some(*i),
        // script numbers are doubles, accept them when they carry an exact integer
        ScriptValue::Float(f) if f.fract() == 0.0 && f.is_finite() => {
            if *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                Some(*f as i64)
            } else {
                None
            }
        }
        _ => None,
    }
}

impl FromScript for bool {
    const KIND: ArgType = ArgType::Bool;

    fn from_script(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromScript for i64 {
    const KIND: ArgType = ArgType::Int;

    fn from_script(value: &ScriptValue) -> Option<Self> {
        integral(value)
    }
}

impl FromScript for i32 {
    const KIND: ArgType = ArgType::Int;

    fn from_script(value: &ScriptValue) -> Option<Self> {
        integral(value).and_then(|i| i32::try_from(i).ok())
    }
}

impl FromScript for f64 {
    const KIND: ArgType = ArgType::Float;

    fn from_script(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::Float(f) => Some(*f),
            ScriptValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromScript for String {
    const KIND: ArgType = ArgType::String;

    fn from_script(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromScript for HandleId {
    const KIND: ArgType = ArgType::Handle;

    fn from_script(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::Handle(id) => Some(*id),
            _ => None,
        }
    }
}

impl FromScript for ScriptValue {
    const KIND: ArgType = ArgType::Any;

    fn from_script(value: &ScriptValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromScript> FromScript for Option<T> {
    const KIND: ArgType = T::KIND;

    fn from_script(value: &ScriptValue) -> Option<Self> {
        if value.is_nil() {
            Some(None)
        } else {
            T::from_script(value).map(Some)
        }
    }
}

impl IntoScript for bool {
    const KIND: ArgType = ArgType::Bool;

    fn into_script(self) -> ScriptValue {
        ScriptValue::Bool(self)
    }
}

impl IntoScript for i32 {
    const KIND: ArgType = ArgType::Int;

    fn into_script(self) -> ScriptValue {
        ScriptValue::Int(self as i64)
    }
}

impl IntoScript for u32 {
    const KIND: ArgType = ArgType::Int;

    fn into_script(self) -> ScriptValue {
        ScriptValue::Int(self as i64)
    }
}

impl IntoScript for i64 {
    const KIND: ArgType = ArgType::Int;

    fn into_script(self) -> ScriptValue {
        ScriptValue::Int(self)
    }
}

impl IntoScript for f64 {
    const KIND: ArgType = ArgType::Float;

    fn into_script(self) -> ScriptValue {
        ScriptValue::Float(self)
    }
}

impl IntoScript for String {
    const KIND: ArgType = ArgType::String;

    fn into_script(self) -> ScriptValue {
        ScriptValue::String(self)
    }
}

impl IntoScript for HandleId {
    const KIND: ArgType = ArgType::Handle;

    fn into_script(self) -> ScriptValue {
        ScriptValue::Handle(self)
    }
}

impl IntoScript for ScriptValue {
    const KIND: ArgType = ArgType::Any;

    fn into_script(self) -> ScriptValue {
        self
    }
}

impl<T: IntoScript> IntoScript for Option<T> {
    const KIND: ArgType = T::KIND;

    fn into_script(self) -> ScriptValue {
        self.map(IntoScript::into_script).unwrap_or(ScriptValue::Nil)
    }
}

/// Native return value, converted into the ordered list of script results.
pub trait IntoReturn {
    const RETURNS: &'static [ArgType];

    fn into_return(self) -> BindingResult<Vec<ScriptValue>>;
}

impl IntoReturn for () {
    const RETURNS: &'static [ArgType] = &[];

    fn into_return(self) -> BindingResult<Vec<ScriptValue>> {
        Ok(Vec::new())
    }
}

macro_rules! impl_single_return {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReturn for $ty {
                const RETURNS: &'static [ArgType] = &[<$ty as IntoScript>::KIND];

                fn into_return(self) -> BindingResult<Vec<ScriptValue>> {
                    Ok(vec![self.into_script()])
                }
            }
        )*
    };
}

impl_single_return!(bool, i32, u32, i64, f64, String, HandleId, ScriptValue);

impl<A: IntoScript, B: IntoScript> IntoReturn for (A, B) {
    const RETURNS: &'static [ArgType] = &[A::KIND, B::KIND];

    fn into_return(self) -> BindingResult<Vec<ScriptValue>> {
        Ok(vec![self.0.into_script(), self.1.into_script()])
    }
}

impl<A: IntoScript, B: IntoScript, C: IntoScript> IntoReturn for (A, B, C) {
    const RETURNS: &'static [ArgType] = &[A::KIND, B::KIND, C::KIND];

    fn into_return(self) -> BindingResult<Vec<ScriptValue>> {
        Ok(vec![
            self.0.into_script(),
            self.1.into_script(),
            self.2.into_script(),
        ])
    }
}

impl<R, E> IntoReturn for Result<R, E>
where
    R: IntoReturn,
    E: Into<BindingError>,
{
    const RETURNS: &'static [ArgType] = R::RETURNS;

    fn into_return(self) -> BindingResult<Vec<ScriptValue>> {
        self.map_err(Into::into)?.into_return()
    }
}
