mod generator;
mod injector;
pub mod tamper;

pub use generator::{FIELD_SEPARATOR, PayloadGenerator, ROW_SEPARATOR};
pub use injector::{InjectError, Injector};
pub use tamper::Tamper;
