use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, TsdbError};

/// Name of a time series, e.g. `sys.cpu.nice`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metric(String);

impl Metric {
    pub fn new(name: impl Into<String>) -> Self {
        Metric(name.into())
    }

    pub fn set(&mut self, name: impl Into<String>) {
        self.0 = name.into();
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks the name before it is sent. Only emptiness is rejected; the
    /// server enforces its own character set.
    pub fn validate(&self) -> Result<()> {
        if self.0.trim().is_empty() {
            return Err(TsdbError::InvalidRequest("metric name must not be empty".to_string()));
        }
        Ok(())
    }
}

impl From<&str> for Metric {
    fn from(name: &str) -> Self {
        Metric::new(name)
    }
}

impl From<String> for Metric {
    fn from(name: String) -> Self {
        Metric(name)
    }
}

impl AsRef<str> for Metric {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
