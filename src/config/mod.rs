pub mod config;

pub use config::{AggregationConfig, DetectorConfig, DetectorKind, PipelineConfig, SamplingConfig, ThumbnailConfig, UploadConfig};
