pub mod analyzer;
pub mod cli;
pub mod http;
pub mod models;
pub mod payload;
pub mod reporter;
pub mod scanner;

pub use analyzer::{ExtractionParser, ResponseClassifier};
pub use http::{HttpClient, HttpResponse, ProbeRequest, RateLimiter, Transport, TransportError};
pub use models::{
    ColumnCount, Dbms, HttpMethod, Level, ProgressEvent, ProgressSink, Row, ScanConfig, ScanResult,
};
pub use payload::{Injector, PayloadGenerator, Tamper};
pub use reporter::{ConsoleReporter, JsonExporter, ScanReport};
pub use scanner::{CancelFlag, ScanError, ScanState, Scanner, scan_with_http};
