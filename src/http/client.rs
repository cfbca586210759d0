use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Proxy};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::models::{HttpMethod, ScanConfig};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid client configuration: {0}")]
    Client(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// A single outgoing probe. `form` is only set for POST delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub method: HttpMethod,
    pub url: String,
    pub form: Option<Vec<(String, String)>>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// The only capability the scanner needs from its environment. Implementations
/// carry headers, proxy, cookies and timeout themselves and must tolerate use
/// from several scans at once.
pub trait Transport {
    fn send(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

/// Blocking reqwest transport configured from a [`ScanConfig`].
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &ScanConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .default_headers(Self::build_headers(config)?)
            .danger_accept_invalid_certs(false);

        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy).map_err(|e| TransportError::Client(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    fn build_headers(config: &ScanConfig) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();

        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| TransportError::Client(format!("header '{}': {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Client(format!("header '{}': {}", key, e)))?;
            headers.insert(name, value);
        }

        if let Some(cookies) = &config.cookies {
            let value = HeaderValue::from_str(cookies)
                .map_err(|e| TransportError::Client(format!("cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        Ok(headers)
    }

    fn build_request(&self, request: &ProbeRequest) -> RequestBuilder {
        let method = Self::to_reqwest_method(request.method);
        let builder = self.client.request(method, &request.url);

        match &request.form {
            Some(form) => builder.form(form),
            None => builder,
        }
    }

    fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        }
    }
}

impl Transport for HttpClient {
    fn send(&self, request: &ProbeRequest) -> Result<HttpResponse, TransportError> {
        let start = Instant::now();
        let response = self.build_request(request).send()?;

        let status = response.status().as_u16();
        let body = response.text()?;

        Ok(HttpResponse {
            status,
            body,
            elapsed: start.elapsed(),
        })
    }
}
