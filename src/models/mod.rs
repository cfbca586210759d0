mod config;
mod progress;
mod result;

pub use config::{
    DEFAULT_MARKER, DEFAULT_MAX_COLUMNS, DEFAULT_REQUESTS_PER_SECOND, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT, HttpMethod, ScanConfig,
};
pub use progress::{Level, NullSink, ProgressEvent, ProgressSink};
pub use result::{ColumnCount, Dbms, Row, ScanResult};
