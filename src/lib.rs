pub mod config;
pub mod errors;
pub mod helper;
pub mod modules;
pub mod pipeline;
pub mod utils;

pub use crate::errors::PostureError;
pub use crate::pipeline::pipeline::PosturePipeline;
