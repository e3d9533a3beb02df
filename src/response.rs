//! Decoded replies from `/api/query` and `/api/put`.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use crate::{Result, Tags, TsdbError, Value};

/// Data points of one result in the order the server sent them.
///
/// Keys are unix timestamps in seconds, or milliseconds when the query asked
/// for millisecond resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dps(Vec<(i64, f64)>);

impl Dps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, timestamp: i64, value: f64) {
        self.0.push((timestamp, value));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.0.iter().copied()
    }

    pub fn get(&self, timestamp: i64) -> Option<f64> {
        self.0.iter().find(|(ts, _)| *ts == timestamp).map(|(_, v)| *v)
    }

    pub fn first(&self) -> Option<(i64, f64)> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<(i64, f64)> {
        self.0.last().copied()
    }

    /// Copy ordered by timestamp, whatever order the server used.
    pub fn sorted(&self) -> Vec<(i64, f64)> {
        let mut points = self.0.clone();
        points.sort_by_key(|(ts, _)| *ts);
        points
    }

    pub fn as_slice(&self) -> &[(i64, f64)] {
        &self.0
    }
}

impl FromIterator<(i64, f64)> for Dps {
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        Dps(iter.into_iter().collect())
    }
}

impl Serialize for Dps {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (ts, value) in &self.0 {
            map.serialize_entry(&ts.to_string(), &Value::from_float(*value))?;
        }
        map.end()
    }
}

struct DpsVisitor;

impl<'de> Visitor<'de> for DpsVisitor {
    type Value = Dps;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of timestamp keys to numbers")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Dps, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut points = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            let ts = key
                .parse::<i64>()
                .map_err(|_| de::Error::custom(format!("dps key {:?} is not a timestamp", key)))?;
            points.push((ts, value.as_f64()));
        }
        Ok(Dps(points))
    }
}

impl<'de> Deserialize<'de> for Dps {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(DpsVisitor)
    }
}

/// One series returned by a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub metric: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(rename = "aggregateTags", default)]
    pub aggregate_tags: Vec<String>,
    #[serde(default)]
    pub dps: Dps,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response(Vec<QueryResult>);

impl Response {
    pub fn new(results: Vec<QueryResult>) -> Self {
        Response(results)
    }

    pub fn results(&self) -> &[QueryResult] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryResult> {
        self.0.iter()
    }

    pub fn into_results(self) -> Vec<QueryResult> {
        self.0
    }
}

impl IntoIterator for Response {
    type Item = QueryResult;
    type IntoIter = std::vec::IntoIter<QueryResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Response {
    type Item = &'a QueryResult;
    type IntoIter = std::slice::Iter<'a, QueryResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A data point the server refused, as reported in `details` mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutError {
    pub datapoint: serde_json::Value,
    pub error: String,
}

/// Body of a put issued with `summary` or `details`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PutSummary {
    #[serde(default)]
    pub success: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<PutError>,
}

/// What `/api/put` answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum PutResponse {
    /// No body, the usual `204 No Content`.
    Empty,
    Results(Response),
    Summary(PutSummary),
}

/// `{"error": {"code": .., "message": ..}}` as sent by the server on failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorEnvelope {
    /// Parses an error body; `None` if it is not an error envelope.
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn body_text(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}

/// Which failure keys a JSON object body carries: `error` and `errors`.
///
/// Only bodies starting with `{` are parsed; query results are arrays and are
/// decoded once, by the caller.
fn failure_keys(body: &[u8]) -> (bool, bool) {
    let trimmed = trim_body(body);
    if !trimmed.starts_with(b"{") {
        return (false, false);
    }
    match serde_json::from_slice::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => (map.contains_key("error"), map.contains_key("errors")),
        _ => (false, false),
    }
}

fn classify_failure(status: u16, body: &[u8]) -> Option<TsdbError> {
    let (error, errors) = failure_keys(body);

    if error || (errors && !is_success(status)) {
        warn!(status, "TSDB server returned an error");
        return Some(TsdbError::Server {
            status,
            body: body_text(body),
        });
    }
    if !is_success(status) {
        return Some(TsdbError::Transport(format!(
            "HTTP {} with undecodable body: {}",
            status,
            body_text(body)
        )));
    }
    None
}

fn trim_body(body: &[u8]) -> &[u8] {
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    let end = body
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &body[start..end]
}

/// Turns an `/api/query` reply into a [`Response`].
pub fn decode_query_reply(status: u16, body: &[u8]) -> Result<Response> {
    if let Some(err) = classify_failure(status, body) {
        return Err(err);
    }
    let response: Response = serde_json::from_slice(body)?;
    debug!(results = response.len(), "decoded query response");
    Ok(response)
}

/// Turns an `/api/put` reply into a [`PutResponse`].
pub fn decode_put_reply(status: u16, body: &[u8]) -> Result<PutResponse> {
    if let Some(err) = classify_failure(status, body) {
        return Err(err);
    }
    let trimmed = trim_body(body);
    if trimmed.is_empty() {
        return Ok(PutResponse::Empty);
    }
    if trimmed.starts_with(b"[") {
        return Ok(PutResponse::Results(serde_json::from_slice(trimmed)?));
    }
    let summary: PutSummary = serde_json::from_slice(trimmed)?;
    debug!(success = summary.success, failed = summary.failed, "decoded put summary");
    Ok(PutResponse::Summary(summary))
}
