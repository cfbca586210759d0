use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_MARKER: &str = "UNIQTEST999";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_COLUMNS: usize = 50;
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        };
        write!(f, "{}", s)
    }
}

impl HttpMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            _ => None,
        }
    }
}

/// Everything a single scan needs to know about its target. Built once by the
/// caller and never mutated while the scan runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub url: String,
    pub param: String,
    pub method: HttpMethod,
    pub timeout_secs: u64,
    pub tampers: Vec<String>,
    pub proxy: Option<String>,
    pub cookies: Option<String>,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
    pub requests_per_second: f64,
    pub max_columns: usize,
    pub marker: String,
}

impl ScanConfig {
    pub fn new(url: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            param: param.into(),
            method: HttpMethod::Get,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            tampers: Vec::new(),
            proxy: None,
            cookies: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: HashMap::new(),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            max_columns: DEFAULT_MAX_COLUMNS,
            marker: DEFAULT_MARKER.to_string(),
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_tampers(mut self, tampers: Vec<String>) -> Self {
        self.tampers = tampers;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_cookies(mut self, cookies: Option<String>) -> Self {
        self.cookies = cookies;
        self
    }

    /// `None` keeps the default browser user agent.
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        if let Some(ua) = user_agent {
            self.user_agent = ua;
        }
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_rate(mut self, requests_per_second: f64) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    pub fn with_max_columns(mut self, max_columns: usize) -> Self {
        self.max_columns = max_columns;
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }
}
