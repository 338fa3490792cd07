//! Hierarchical run-time options.
//!
//! This module provides the `Options` tree, which is used to configure Laplacian
//! inversions from a JSON input file or through API calls. A section holds named
//! values (booleans, integers, reals, strings) and nested sections; the iterative
//! solver for example reads its own tolerances from its section and hands the
//! nested `delp2solver` section to the inner direct solver.
//!
//! Typed getters take a default that is used when a key is absent. A key that is
//! present with the wrong type is a configuration error, never silently ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LapError;
use crate::operators::DiffMethod;
use crate::solver::InvertFlags;

/// A single option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    Section(Options),
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self { OptionValue::Bool(v) }
}
impl From<i64> for OptionValue {
    fn from(v: i64) -> Self { OptionValue::Int(v) }
}
impl From<i32> for OptionValue {
    fn from(v: i32) -> Self { OptionValue::Int(v.into()) }
}
impl From<f64> for OptionValue {
    fn from(v: f64) -> Self { OptionValue::Real(v) }
}
impl From<&str> for OptionValue {
    fn from(v: &str) -> Self { OptionValue::Str(v.to_string()) }
}
impl From<String> for OptionValue {
    fn from(v: String) -> Self { OptionValue::Str(v) }
}
impl From<Options> for OptionValue {
    fn from(v: Options) -> Self { OptionValue::Section(v) }
}

/// One section of the options tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    values: BTreeMap<String, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self, LapError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, LapError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Builder-style setter.
    pub fn with<V: Into<OptionValue>>(mut self, key: &str, value: V) -> Self {
        self.set(key, value);
        self
    }

    pub fn set<V: Into<OptionValue>>(&mut self, key: &str, value: V) -> &mut Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    pub fn get_real(&self, key: &str, default: f64) -> Result<f64, LapError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(OptionValue::Real(v)) => Ok(*v),
            Some(OptionValue::Int(v)) => Ok(*v as f64),
            Some(other) => Err(wrong_type(key, "a real number", other)),
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, LapError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(OptionValue::Int(v)) => Ok(*v),
            Some(other) => Err(wrong_type(key, "an integer", other)),
        }
    }

    /// Non-negative integer.
    pub fn get_usize(&self, key: &str, default: usize) -> Result<usize, LapError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(OptionValue::Int(v)) => usize::try_from(*v)
                .map_err(|_| LapError::Config(format!("option '{key}' must be non-negative, got {v}"))),
            Some(other) => Err(wrong_type(key, "a non-negative integer", other)),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, LapError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(OptionValue::Bool(v)) => Ok(*v),
            Some(other) => Err(wrong_type(key, "a boolean", other)),
        }
    }

    pub fn get_str(&self, key: &str, default: &str) -> Result<String, LapError> {
        match self.values.get(key) {
            None => Ok(default.to_string()),
            Some(OptionValue::Str(v)) => Ok(v.clone()),
            Some(other) => Err(wrong_type(key, "a string", other)),
        }
    }

    /// Boundary flags given either as integer bits or as text like `"SET | GRAD"`.
    pub fn get_flags(&self, key: &str) -> Result<InvertFlags, LapError> {
        match self.values.get(key) {
            None => Ok(InvertFlags::empty()),
            Some(OptionValue::Int(bits)) => InvertFlags::from_bits_checked(*bits),
            Some(OptionValue::Str(text)) => InvertFlags::parse(text),
            Some(other) => Err(wrong_type(key, "boundary flags", other)),
        }
    }

    /// Nested section `name`; an absent section is empty.
    pub fn get_section(&self, name: &str) -> Result<Options, LapError> {
        match self.values.get(name) {
            None => Ok(Options::new()),
            Some(OptionValue::Section(section)) => Ok(section.clone()),
            Some(other) => Err(wrong_type(name, "a section", other)),
        }
    }
}

fn wrong_type(key: &str, expected: &str, found: &OptionValue) -> LapError {
    LapError::Config(format!("option '{key}' must be {expected}, found {found:?}"))
}

/// Settings of the iterative variable-coefficient solver.
#[derive(Debug, Clone, PartialEq)]
pub struct NaulinOptions {
    /// Relative error tolerance
    pub rtol: f64,
    /// Absolute error tolerance
    pub atol: f64,
    /// Maximum number of outer iterations
    pub maxits: usize,
    /// Derivatives used in the gradient coupling term
    pub diff_method: DiffMethod,
    /// Name of the mean-iteration-count diagnostic
    pub diagnostic_name: String,
    pub global_flags: InvertFlags,
    pub inner_boundary_flags: InvertFlags,
    pub outer_boundary_flags: InvertFlags,
}

impl Default for NaulinOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-7,
            atol: 1e-20,
            maxits: 100,
            diff_method: DiffMethod::C2,
            diagnostic_name: "naulinsolver_mean_its".to_string(),
            global_flags: InvertFlags::empty(),
            inner_boundary_flags: InvertFlags::empty(),
            outer_boundary_flags: InvertFlags::empty(),
        }
    }
}

impl NaulinOptions {
    pub fn from_options(opt: &Options) -> Result<Self, LapError> {
        let defaults = Self::default();
        let rtol = opt.get_real("rtol", defaults.rtol)?;
        let atol = opt.get_real("atol", defaults.atol)?;
        if rtol.is_nan() || atol.is_nan() || rtol < 0.0 || atol < 0.0 {
            return Err(LapError::Config(format!(
                "tolerances must be non-negative, got rtol={rtol}, atol={atol}"
            )));
        }
        Ok(Self {
            rtol,
            atol,
            maxits: opt.get_usize("maxits", defaults.maxits)?,
            diff_method: opt.get_str("diff_method", "C2")?.parse()?,
            diagnostic_name: opt.get_str("diagnostic_name", &defaults.diagnostic_name)?,
            global_flags: opt.get_flags("global_flags")?,
            inner_boundary_flags: opt.get_flags("inner_boundary_flags")?,
            outer_boundary_flags: opt.get_flags("outer_boundary_flags")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_keys_are_absent() {
        let opts = NaulinOptions::from_options(&Options::new()).unwrap();
        assert_eq!(opts.rtol, 1e-7);
        assert_eq!(opts.atol, 1e-20);
        assert_eq!(opts.maxits, 100);
        assert_eq!(opts.diff_method, DiffMethod::C2);
        assert_eq!(opts.diagnostic_name, "naulinsolver_mean_its");
    }

    #[test]
    fn nested_sections_from_json() {
        let opt = Options::from_json_str(
            r#"{
                "type": "naulin",
                "rtol": 1e-9,
                "maxits": 20,
                "inner_boundary_flags": "SET",
                "outer_boundary_flags": 1,
                "delp2solver": { "type": "dense" }
            }"#,
        )
        .unwrap();
        let naulin = NaulinOptions::from_options(&opt).unwrap();
        assert_eq!(naulin.rtol, 1e-9);
        assert_eq!(naulin.maxits, 20);
        assert_eq!(naulin.inner_boundary_flags, InvertFlags::SET);
        assert_eq!(naulin.outer_boundary_flags, InvertFlags::GRAD);
        let inner = opt.get_section("delp2solver").unwrap();
        assert_eq!(inner.get_str("type", "").unwrap(), "dense");
        assert!(opt.get_section("missing").unwrap().get("type").is_none());
    }

    #[test]
    fn wrong_types_are_rejected() {
        let opt = Options::new().with("maxits", -3).with("rtol", "small").with("delp2solver", 1.0);
        assert!(matches!(opt.get_usize("maxits", 0), Err(LapError::Config(_))));
        assert!(opt.get_real("rtol", 0.0).is_err());
        assert!(opt.get_section("delp2solver").is_err());
        assert!(NaulinOptions::from_options(&Options::new().with("atol", -1.0)).is_err());
        assert!(NaulinOptions::from_options(&Options::new().with("diff_method", "W3")).is_err());
    }

    #[test]
    fn integers_are_accepted_as_reals() {
        let opt = Options::new().with("rtol", 0);
        assert_eq!(opt.get_real("rtol", 1.0).unwrap(), 0.0);
    }
}
