pub mod catalog;
pub mod document;
pub mod etl;
pub mod hyperlink;
pub mod layer;
pub mod mode;
pub mod pipeline;
pub mod scanner;

pub use crate::domain::model::{Extraction, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Fetcher, Pipeline, Storage};
pub use crate::utils::error::Result;
