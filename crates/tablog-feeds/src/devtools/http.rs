//! JSON-over-HTTP endpoints of the DevTools host (`/json/list`,
//! `/json/version`).

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::Uri;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use tablog_core::{Error, Result};

pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub(crate) struct HttpJson {
    client: Client<HttpConnector, Empty<Bytes>>,
    base: String,
    timeout: Duration,
}

impl HttpJson {
    pub(crate) fn new(host: &str, port: u16) -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            base: format!("http://{host}:{port}"),
            timeout: HTTP_TIMEOUT,
        }
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub(crate) fn base(&self) -> &str {
        &self.base
    }

    /// GET `path` and decode the JSON body.
    ///
    /// The deadline covers the whole exchange, body included. Transport
    /// failures, timeouts and non-success statuses are connection errors; an
    /// undecodable body is a protocol error.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = tokio::time::timeout(self.timeout, self.fetch(path))
            .await
            .map_err(|_| Error::connection(&self.base, format!("GET {path} timed out")))??;

        serde_json::from_slice(&body)
            .map_err(|e| Error::Protocol(format!("invalid {path} response: {e}")))
    }

    async fn fetch(&self, path: &str) -> Result<Bytes> {
        let uri: Uri = format!("{}{}", self.base, path)
            .parse()
            .map_err(|e| Error::connection(&self.base, e))?;

        let response = self
            .client
            .get(uri)
            .await
            .map_err(|e| Error::connection(&self.base, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::connection(
                &self.base,
                format!("GET {path} returned {status}"),
            ));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::connection(&self.base, e))?
            .to_bytes();
        Ok(body)
    }
}
