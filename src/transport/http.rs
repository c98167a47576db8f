//! HTTP transport over reqwest
//!
//! The default transport for real hosts. Bodies are sent as form-encoded
//! payloads (the form serialization the resolver produces), responses are
//! streamed so download progress can be reported, and the abort signal is
//! honored both before headers arrive and mid-stream.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::{Transport, TransportError, TransportRequest, TransportResponse};

/// reqwest-backed [`Transport`]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Use an existing client (shared pools, custom timeouts)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, "HttpTransport::send: called");

        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| TransportError::Method(request.method.clone()))?;

        let mut builder = self.client.request(method, &request.url);
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body.clone());
            request.progress.upload(100.0);
        }

        let mut abort = request.abort.clone();
        let response = tokio::select! {
            result = builder.send() => result?,
            _ = abort.aborted() => return Err(TransportError::Aborted),
        };

        let status = response.status().as_u16();
        let total = response.content_length();
        let mut stream = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();

        loop {
            let chunk = tokio::select! {
                chunk = stream.next() => chunk,
                _ = abort.aborted() => return Err(TransportError::Aborted),
            };
            match chunk {
                Some(Ok(bytes)) => {
                    buf.extend_from_slice(&bytes);
                    if let Some(total) = total.filter(|t| *t > 0) {
                        let percent = (buf.len() as f64 / total as f64) * 100.0;
                        request.progress.download(percent.min(100.0));
                    }
                }
                Some(Err(e)) => return Err(TransportError::Network(e)),
                None => break,
            }
        }

        let body = String::from_utf8_lossy(&buf).into_owned();
        debug!(status, body_len = body.len(), "HttpTransport::send: complete");

        if status >= 400 {
            return Err(TransportError::Status { status, body });
        }
        Ok(TransportResponse { status, body })
    }
}
