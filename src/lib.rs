pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::{http::ReqwestFetcher, storage::LocalStorage};
pub use crate::config::{CliConfig, Settings};
pub use crate::core::{etl::EtlEngine, pipeline::TtpPipeline};
pub use crate::utils::error::{EtlError, Result};
