mod console;
mod export;

pub use console::ConsoleReporter;
pub use export::{JsonExporter, ScanReport};
