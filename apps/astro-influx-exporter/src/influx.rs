use crate::config::ExporterConfig;
use crate::dispatch::{ConnectionStatus, PointSink, SinkError, WriteTarget};
use crate::point::{encode_batch, Point};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const VERSION_HEADER: &str = "X-Influxdb-Version";
const MAX_ERROR_BODY: usize = 512;

/// InfluxDB v2 HTTP write sink.
#[derive(Clone)]
pub struct InfluxSink {
    client: Client,
}

impl InfluxSink {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build influxdb http client")?;
        Ok(Self { client })
    }

    async fn write_batch(&self, target: &WriteTarget, points: &[Point]) -> Result<(), SinkError> {
        let (body, errors) = encode_batch(points);
        for err in &errors {
            tracing::warn!(error = %err, "dropping unencodable point");
        }
        if body.is_empty() {
            return match errors.into_iter().next() {
                Some(err) => Err(SinkError::Encode(err)),
                None => Ok(()),
            };
        }

        let url = write_url(target)?;
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Token {}", target.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                message: truncate(message.trim()),
            });
        }
        Ok(())
    }

    async fn check_connection(&self, config: &ExporterConfig) -> ConnectionStatus {
        if !config.is_valid() {
            return ConnectionStatus::failed(
                "InfluxDB URL, token, organization and bucket must all be set",
            );
        }
        let target = WriteTarget::from_config(config);

        let ping = match endpoint(&target.url, "/ping") {
            Ok(url) => url,
            Err(err) => return ConnectionStatus::failed(err.to_string()),
        };
        let response = match self
            .client
            .get(ping)
            .header(AUTHORIZATION, format!("Token {}", target.token))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                return ConnectionStatus::failed(format!("cannot reach {}: {err}", target.url))
            }
        };
        if !response.status().is_success() {
            return ConnectionStatus::failed(format!(
                "ping returned {}",
                response.status()
            ));
        }
        let version = response
            .headers()
            .get(VERSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        match self.find_bucket(&target).await {
            Ok(true) => ConnectionStatus::ok(format!(
                "connected to InfluxDB {version}; bucket {} is writable",
                target.bucket
            )),
            Ok(false) => ConnectionStatus::failed(format!(
                "bucket {} was not found in organization {}",
                target.bucket, target.org
            )),
            Err(err) => ConnectionStatus::failed(err.to_string()),
        }
    }

    async fn find_bucket(&self, target: &WriteTarget) -> Result<bool, SinkError> {
        let mut url = endpoint(&target.url, "/api/v2/buckets")?;
        url.query_pairs_mut()
            .append_pair("name", &target.bucket)
            .append_pair("orgID", &target.org);

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Token {}", target.token))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                message: truncate(message.trim()),
            });
        }

        let listing: BucketListing = response.json().await?;
        Ok(listing
            .buckets
            .iter()
            .any(|bucket| bucket.name == target.bucket))
    }
}

impl PointSink for InfluxSink {
    fn write<'a>(
        &'a self,
        target: &'a WriteTarget,
        points: &'a [Point],
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(self.write_batch(target, points))
    }

    fn check<'a>(&'a self, config: &'a ExporterConfig) -> BoxFuture<'a, ConnectionStatus> {
        Box::pin(self.check_connection(config))
    }
}

#[derive(Debug, Deserialize)]
struct BucketListing {
    #[serde(default)]
    buckets: Vec<BucketEntry>,
}

#[derive(Debug, Deserialize)]
struct BucketEntry {
    name: String,
}

/// Joins `path` onto the base URL, keeping any path prefix the server is mounted under.
fn endpoint(base: &str, path: &str) -> Result<Url, SinkError> {
    let mut url =
        Url::parse(base.trim()).map_err(|err| SinkError::InvalidUrl(format!("{base}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SinkError::InvalidUrl(format!(
            "{base}: scheme must be http or https"
        )));
    }
    let prefix = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{prefix}{path}"));
    url.set_query(None);
    Ok(url)
}

pub fn write_url(target: &WriteTarget) -> Result<Url, SinkError> {
    let mut url = endpoint(&target.url, "/api/v2/write")?;
    url.query_pairs_mut()
        .append_pair("org", &target.org)
        .append_pair("bucket", &target.bucket)
        .append_pair("precision", "ns");
    Ok(url)
}

fn truncate(message: &str) -> String {
    if message.len() <= MAX_ERROR_BODY {
        return message.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &message[..end])
}
