//! HTTP transport capability
//!
//! The share client never talks to the network directly. It hands fully
//! formed requests to a [`Transport`] and classifies whatever comes back,
//! so any conforming HTTP stack (or an in-memory fake) can stand in.

use crate::error::{AzfilesError, Result};
use crate::utils::network::{create_http_client, NetworkConfig};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, Method};
use tracing::debug;
use url::Url;

/// One outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// First header value with the given name, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A fully buffered response
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A response whose body is consumed incrementally
pub struct StreamingResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: BoxStream<'static, Result<Vec<u8>>>,
}

impl StreamingResponse {
    /// Drain the body into a buffered response, for error reporting
    pub async fn into_buffered(self) -> Result<HttpResponse> {
        let chunks: Vec<Vec<u8>> = self.body.try_collect().await?;
        Ok(HttpResponse {
            status: self.status,
            headers: self.headers,
            body: chunks.concat(),
        })
    }
}

/// Performs request/response round-trips
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and buffer the whole response
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Send a request and hand back the body as a stream
    async fn send_streaming(&self, request: HttpRequest) -> Result<StreamingResponse>;
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Production transport on top of `reqwest`
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        Ok(Self {
            client: create_http_client(config)?,
        })
    }

    async fn execute(&self, request: HttpRequest) -> Result<reqwest::Response> {
        debug!("{} {}", request.method, request.url.path());
        let mut builder = self.client.request(request.method, request.url);
        for (key, value) in request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;
        debug!("-> {}", response.status());
        Ok(response)
    }
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect()
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.execute(request).await?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send_streaming(&self, request: HttpRequest) -> Result<StreamingResponse> {
        let response = self.execute(request).await?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(AzfilesError::from))
            .boxed();
        Ok(StreamingResponse {
            status,
            headers,
            body,
        })
    }
}
