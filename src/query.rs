//! Bodies for `POST /api/query`.

use serde::{Deserialize, Serialize};

use crate::{Metric, Result, Tags, TimeValue, TsdbError};

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// A single sub query: one metric, one aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub aggregator: String,
    pub metric: Metric,
    #[serde(default)]
    pub rate: bool,
    /// `<interval>-<aggregator>`, e.g. `1m-avg`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downsample: Option<String>,
    #[serde(default)]
    pub tags: Tags,
}

impl Query {
    pub fn new(aggregator: impl Into<String>, metric: impl Into<Metric>) -> Self {
        Self {
            aggregator: aggregator.into(),
            metric: metric.into(),
            ..Default::default()
        }
    }

    pub fn rate(mut self, rate: bool) -> Self {
        self.rate = rate;
        self
    }

    pub fn downsample(mut self, spec: impl Into<String>) -> Self {
        self.downsample = Some(spec.into());
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.set(key, value);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.aggregator.trim().is_empty() {
            return Err(TsdbError::InvalidRequest(format!(
                "query for {:?} has no aggregator",
                self.metric.as_str()
            )));
        }
        self.metric.validate()?;
        if let Some(spec) = &self.downsample {
            if !spec.contains('-') {
                return Err(TsdbError::InvalidRequest(format!(
                    "downsample {:?} is not <interval>-<aggregator>",
                    spec
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub start: TimeValue,
    #[serde(default, skip_serializing_if = "skip_time")]
    pub end: TimeValue,
    #[serde(default, skip_serializing_if = "is_false")]
    pub padding: bool,
    pub queries: Vec<Query>,
}

fn skip_time(time: &TimeValue) -> bool {
    !time.is_set()
}

impl Request {
    pub fn new(start: TimeValue) -> Self {
        Self {
            start,
            ..Default::default()
        }
    }

    pub fn end(mut self, end: TimeValue) -> Self {
        self.end = end;
        self
    }

    pub fn padding(mut self, padding: bool) -> Self {
        self.padding = padding;
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.queries.push(query);
        self
    }

    /// Checks the constraints the server would otherwise reject.
    pub fn validate(&self) -> Result<()> {
        if !self.start.is_set() {
            return Err(TsdbError::InvalidRequest("start time is required".to_string()));
        }
        if self.queries.is_empty() {
            return Err(TsdbError::InvalidRequest("at least one query is required".to_string()));
        }
        for query in &self.queries {
            query.validate()?;
        }
        Ok(())
    }
}
