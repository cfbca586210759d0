mod client;
mod rate_limit;

pub use client::{HttpClient, HttpResponse, ProbeRequest, Transport, TransportError};
pub use rate_limit::RateLimiter;
