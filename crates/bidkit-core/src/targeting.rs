//! Process-wide targeting state shared by every builder.
//!
//! Callers hold a [`SharedTargeting`] handle. Writers take the write lock,
//! builders only ever take the read lock. Values are last-write-wins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Legacy parameter key that stands in for the typed COPPA field.
pub const COPPA_PARAM: &str = "coppa";

pub type SharedTargeting = Arc<RwLock<Targeting>>;

/// A loosely typed number as callers hand it over: integers and floats are
/// both accepted and only judged when the request is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericValue {
    Int(i64),
    Float(f64),
}

impl From<i64> for NumericValue {
    fn from(v: i64) -> Self {
        NumericValue::Int(v)
    }
}

impl From<i32> for NumericValue {
    fn from(v: i32) -> Self {
        NumericValue::Int(v.into())
    }
}

impl From<f64> for NumericValue {
    fn from(v: f64) -> Self {
        NumericValue::Float(v)
    }
}

impl From<bool> for NumericValue {
    fn from(v: bool) -> Self {
        NumericValue::Int(v as i64)
    }
}

impl NumericValue {
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(i) = s.parse::<i64>() {
            return Some(NumericValue::Int(i));
        }
        s.parse::<f64>().ok().map(NumericValue::Float)
    }
}

/// Lenient COPPA clamp: only exact 0 or 1 survive, anything else is dropped.
pub fn normalize_coppa(value: Option<NumericValue>) -> Option<i64> {
    match value? {
        NumericValue::Int(v @ (0 | 1)) => Some(v),
        NumericValue::Int(_) => None,
        NumericValue::Float(f) if f == 0.0 => Some(0),
        NumericValue::Float(f) if f == 1.0 => Some(1),
        NumericValue::Float(_) => None,
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Targeting {
    #[serde(default)]
    coppa: Option<NumericValue>,
    #[serde(default, rename = "params")]
    parameters: BTreeMap<String, String>,
}

impl Targeting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedTargeting {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn into_shared(self) -> SharedTargeting {
        Arc::new(RwLock::new(self))
    }

    /// The typed value when set, otherwise the legacy `coppa` parameter.
    pub fn coppa(&self) -> Option<NumericValue> {
        self.coppa.or_else(|| {
            self.parameters
                .get(COPPA_PARAM)
                .and_then(|raw| NumericValue::parse(raw))
        })
    }

    pub fn set_coppa(&mut self, value: impl Into<NumericValue>) {
        self.coppa = Some(value.into());
    }

    pub fn clear_coppa(&mut self) {
        self.coppa = None;
    }

    pub fn add_param(&mut self, value: impl Into<String>, name: impl Into<String>) {
        self.parameters.insert(name.into(), value.into());
    }

    pub fn remove_param(&mut self, name: &str) -> Option<String> {
        self.parameters.remove(name)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn clear_parameters(&mut self) {
        self.parameters.clear();
    }
}

// The state is plain values, so a writer that panicked cannot leave it torn.
pub fn read(targeting: &SharedTargeting) -> RwLockReadGuard<'_, Targeting> {
    targeting.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write(targeting: &SharedTargeting) -> RwLockWriteGuard<'_, Targeting> {
    targeting.write().unwrap_or_else(PoisonError::into_inner)
}
