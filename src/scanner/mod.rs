mod cancel;
mod engine;

pub use cancel::CancelFlag;
pub use engine::{
    MAX_DATABASES, MAX_TABLES_PER_DATABASE, ROWS_PER_TABLE, ScanError, ScanState, Scanner,
    scan_with_http,
};
