//! Client for a time-series database speaking HTTP/JSON on `/api/query` and
//! `/api/put`.
//!
//! ```no_run
//! # async fn run() -> tsdb_client::Result<()> {
//! use tsdb_client::{Endpoint, Query, Request};
//!
//! let endpoint = Endpoint::dial("127.0.0.1", 4242)?;
//! let req = Request::new("1h-ago".parse()?)
//!     .query(Query::new("sum", "sys.cpu.nice").tag("host", "web01"));
//! for result in endpoint.query(&req).await? {
//!     for (ts, value) in result.dps.iter() {
//!         println!("{} {} {}", result.metric, ts, value);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod datapoint;
pub mod error;
pub mod logging;
pub mod metric;
pub mod metrics;
pub mod query;
pub mod response;
pub mod tags;
pub mod time;
pub mod transport;
pub mod value;

pub use client::Endpoint;
pub use config::ClientConfig;
pub use datapoint::DataPoint;
pub use error::{Result, TsdbError};
pub use metric::Metric;
pub use query::{Query, Request};
pub use response::{Dps, ErrorEnvelope, PutResponse, PutSummary, QueryResult, Response};
pub use tags::Tags;
pub use time::{TimeFormat, TimeValue};
pub use transport::{HttpReply, ReqwestTransport, Transport};
pub use value::Value;

pub use tokio_util::sync::CancellationToken;
