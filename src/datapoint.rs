//! Bodies for `POST /api/put`.

use serde::{Deserialize, Serialize};

use crate::{Metric, Result, Tags, TimeValue, TsdbError, Value};

/// A single observation to be stored by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: TimeValue,
    pub metric: Metric,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl DataPoint {
    pub fn new(timestamp: TimeValue, metric: impl Into<Metric>, value: impl Into<Value>) -> Self {
        Self {
            timestamp,
            metric: metric.into(),
            value: value.into(),
            tags: None,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.get_or_insert_with(Tags::new).set(key, value);
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.timestamp.is_set() {
            return Err(TsdbError::InvalidRequest(format!(
                "data point for {:?} has no timestamp",
                self.metric.as_str()
            )));
        }
        self.metric.validate()?;
        if !self.value.is_finite() {
            return Err(TsdbError::InvalidValue(format!(
                "data point for {:?} has non-finite value {}",
                self.metric.as_str(),
                self.value
            )));
        }
        Ok(())
    }
}

/// Validates a whole put batch; an empty batch is rejected.
pub fn validate_batch(points: &[DataPoint]) -> Result<()> {
    if points.is_empty() {
        return Err(TsdbError::InvalidRequest("no data points to put".to_string()));
    }
    points.iter().try_for_each(DataPoint::validate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_datapoint_shape() {
        let point = DataPoint::new("1600000000".parse().unwrap(), "sys.cpu.nice", 80i64)
            .with_tag("host", "web01");
        assert_eq!(
            serde_json::to_value(&point).unwrap(),
            json!({
                "timestamp": 1600000000,
                "metric": "sys.cpu.nice",
                "value": 80,
                "tags": {"host": "web01"}
            })
        );
    }

    #[test]
    fn test_tags_omitted_when_absent() {
        let point = DataPoint::new("1600000000".parse().unwrap(), "m", 1.5);
        let value = serde_json::to_value(&point).unwrap();
        assert!(value.get("tags").is_none());
    }

    #[test]
    fn test_validate() {
        let ts: TimeValue = "1600000000".parse().unwrap();
        assert!(DataPoint::new(ts.clone(), "m", 1.0).validate().is_ok());
        assert!(DataPoint::new(TimeValue::new(), "m", 1.0).validate().is_err());
        assert!(DataPoint::new(ts.clone(), "", 1.0).validate().is_err());
        assert!(matches!(
            DataPoint::new(ts.clone(), "m", f64::NAN).validate(),
            Err(TsdbError::InvalidValue(_))
        ));
        assert!(validate_batch(&[]).is_err());
        assert!(validate_batch(&[DataPoint::new(ts, "m", 1.0)]).is_ok());
    }
}
