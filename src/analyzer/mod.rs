mod classifier;
mod extract;

pub use classifier::ResponseClassifier;
pub use extract::ExtractionParser;
