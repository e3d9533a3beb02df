use std::future::Future;

use serde::Serialize;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    config::{join_host_port, ClientConfig},
    datapoint::validate_batch,
    metrics::{self, RequestTimer},
    response::{decode_put_reply, decode_query_reply},
    transport::{HttpReply, ReqwestTransport, Transport},
    DataPoint, PutResponse, Request, Response, Result, TsdbError,
};

const CONTENT_TYPE: &str = "application/json";
const QUERY_PATH: &str = "/api/query";
const PUT_PATH: &str = "/api/put";

/// Client bound to one TSDB server.
///
/// Holds no per-call state: concurrent calls on a shared `Endpoint` are fine
/// as long as the transport allows it. Calls never retry.
#[derive(Debug, Clone)]
pub struct Endpoint<T = ReqwestTransport> {
    authority: String,
    transport: T,
}

impl Endpoint<ReqwestTransport> {
    /// Endpoint for `host:port` over a fresh `reqwest` client.
    pub fn dial(host: &str, port: u16) -> Result<Self> {
        Self::with_transport(host, port, ReqwestTransport::new())
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::dial(&config.host, config.port)
    }
}

impl<T: Transport> Endpoint<T> {
    pub fn with_transport(host: &str, port: u16, transport: T) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(TsdbError::InvalidRequest("host must not be empty".to_string()));
        }
        Ok(Self {
            authority: join_host_port(host, port),
            transport,
        })
    }

    /// `host:port` this endpoint talks to.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.authority, path)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs a query against `/api/query`.
    pub async fn query(&self, req: &Request) -> Result<Response> {
        self.run_query(req, None).await
    }

    /// Like [`Endpoint::query`], failing with `TsdbError::Canceled` as soon as
    /// `cancel` fires.
    pub async fn query_with_cancel(
        &self,
        req: &Request,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        self.run_query(req, Some(cancel)).await
    }

    /// Stores `points` through `/api/put`.
    pub async fn put(&self, points: &[DataPoint]) -> Result<PutResponse> {
        self.run_put(points, None).await
    }

    pub async fn put_with_cancel(
        &self,
        points: &[DataPoint],
        cancel: &CancellationToken,
    ) -> Result<PutResponse> {
        self.run_put(points, Some(cancel)).await
    }

    async fn run_query(
        &self,
        req: &Request,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response> {
        let outcome = async {
            req.validate()?;
            let body = encode_body(req)?;
            let reply = self.send(QUERY_PATH, body, cancel).await?;
            decode_query_reply(reply.status, &reply.body)
        }
        .await;
        self.observe(QUERY_PATH, outcome)
    }

    async fn run_put(
        &self,
        points: &[DataPoint],
        cancel: Option<&CancellationToken>,
    ) -> Result<PutResponse> {
        let outcome = async {
            validate_batch(points)?;
            let body = encode_body(points)?;
            let reply = self.send(PUT_PATH, body, cancel).await?;
            decode_put_reply(reply.status, &reply.body)
        }
        .await;
        self.observe(PUT_PATH, outcome)
    }

    async fn send(
        &self,
        path: &'static str,
        body: Vec<u8>,
        cancel: Option<&CancellationToken>,
    ) -> Result<HttpReply> {
        let url = self.url(path);
        let _timer = RequestTimer::new(path);
        debug!(url = %url, bytes = body.len(), "sending TSDB request");

        let call = self.transport.post(&url, CONTENT_TYPE, body);
        match cancel {
            Some(token) => cancellable(call, token).await,
            None => call.await,
        }
    }

    fn observe<R>(&self, path: &'static str, outcome: Result<R>) -> Result<R> {
        if let Err(err) = &outcome {
            info!(endpoint = %self.authority, path, error = %err, "TSDB request failed");
            metrics::record_error(path, err);
        }
        outcome
    }
}

/// Serializes an outgoing body. Failures here are the caller's data, not the
/// server's reply.
fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>> {
    serde_json::to_vec(body)
        .map_err(|e| TsdbError::InvalidRequest(format!("cannot encode request body: {}", e)))
}

/// Drives `call` until it finishes or `token` is cancelled. An already
/// cancelled token fails without polling `call`.
async fn cancellable<F, R>(call: F, token: &CancellationToken) -> Result<R>
where
    F: Future<Output = Result<R>>,
{
    if token.is_cancelled() {
        return Err(TsdbError::Canceled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(TsdbError::Canceled),
        result = call => result,
    }
}
