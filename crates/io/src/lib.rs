// File I/O operations

pub mod dataset;
pub mod export;

pub use dataset::{load_dataset, load_dataset_with_delimiter, LoadError};
pub use export::ExportFormat;
