use std::env;
use std::process;

use tsdb_client::{
    logging, ClientConfig, DataPoint, Endpoint, PutResponse, Query, Request, Result, Tags,
    TimeValue, TsdbError, Value,
};

const USAGE: &str = "usage:
  tsdb query <start> <aggregator> <metric> [tag=value ...]
  tsdb put <metric> <value> [tag=value ...]

Server address comes from TSDB_HOST and TSDB_PORT (default 127.0.0.1:4242).";

fn parse_tags(args: &[String]) -> Result<Tags> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                .ok_or_else(|| TsdbError::InvalidRequest(format!("tag {:?} is not key=value", arg)))
        })
        .collect()
}

async fn run(args: &[String]) -> Result<String> {
    let config = ClientConfig::from_env()?;
    let endpoint = Endpoint::from_config(&config)?;

    match args {
        [cmd, start, aggregator, metric, tags @ ..] if cmd == "query" => {
            let mut query = Query::new(aggregator.as_str(), metric.as_str());
            query.tags = parse_tags(tags)?;
            let req = Request::new(start.parse()?).query(query);
            let response = endpoint.query(&req).await?;
            Ok(serde_json::to_string_pretty(&response)?)
        }
        [cmd, metric, value, tags @ ..] if cmd == "put" => {
            let point = DataPoint::new(TimeValue::now(), metric.as_str(), Value::from_string(value)?)
                .with_tags(parse_tags(tags)?);
            let summary = match endpoint.put(&[point]).await? {
                PutResponse::Empty => "{}".to_string(),
                PutResponse::Results(response) => serde_json::to_string_pretty(&response)?,
                PutResponse::Summary(summary) => serde_json::to_string_pretty(&summary)?,
            };
            Ok(summary)
        }
        _ => Err(TsdbError::InvalidRequest(USAGE.to_string())),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = logging::init_logger("tsdb") {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
