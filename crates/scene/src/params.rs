use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Values are always arrays, matching how the renderer receives them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(Vec<i32>),
    Float(Vec<f32>),
    String(Vec<String>),
}

impl ParamValue {
    pub fn is_finite(&self) -> bool {
        match self {
            ParamValue::Float(values) => values.iter().all(|value| value.is_finite()),
            _ => true,
        }
    }
}

/// Shader and option parameters keyed by their inline declaration,
/// e.g. `"color diffuseColor"` or `"reference float dispScalar"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamList {
    values: BTreeMap<String, ParamValue>,
}

impl ParamList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, decl: impl Into<String>, value: ParamValue) {
        self.values.insert(decl.into(), value);
    }

    pub fn get(&self, decl: &str) -> Option<&ParamValue> {
        self.values.get(decl)
    }

    pub fn with(mut self, decl: impl Into<String>, value: ParamValue) -> Self {
        self.set(decl, value);
        self
    }

    pub fn with_int(self, decl: impl Into<String>, value: i32) -> Self {
        self.with(decl, ParamValue::Int(vec![value]))
    }

    pub fn with_float(self, decl: impl Into<String>, value: f32) -> Self {
        self.with(decl, ParamValue::Float(vec![value]))
    }

    pub fn with_floats(self, decl: impl Into<String>, values: &[f32]) -> Self {
        self.with(decl, ParamValue::Float(values.to_vec()))
    }

    pub fn with_color(self, decl: impl Into<String>, rgb: [f32; 3]) -> Self {
        self.with(decl, ParamValue::Float(rgb.to_vec()))
    }

    pub fn with_string(self, decl: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(decl, ParamValue::String(vec![value.into()]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(decl, value)| (decl.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Declaration of the first float value that is NaN or infinite.
    pub fn first_non_finite(&self) -> Option<&str> {
        self.iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(decl, _)| decl)
    }

    /// Shader handles named by `reference` parameters, e.g. `disp` for
    /// `"reference float dispScalar": ["disp:resultF"]`.
    pub fn referenced_handles(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(decl, _)| decl.starts_with("reference "))
            .filter_map(|(_, value)| match value {
                ParamValue::String(targets) => Some(targets),
                _ => None,
            })
            .flatten()
            .map(|target| target.split_once(':').map_or(target.as_str(), |(handle, _)| handle))
    }
}
