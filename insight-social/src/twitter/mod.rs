//! Twitter/X extraction surface.
//!
//! - [`url`]: classify pasted URLs as tweets or profiles
//! - [`client`]: direct scraping API (`X-API-Key` auth)
//! - [`job`]: hosted scraping jobs with a polling state machine
//! - [`normalize`]: map loosely shaped upstream JSON onto the output schema
//! - [`pipeline`]: per-batch orchestration and run logging
pub mod client;
pub mod error;
pub mod job;
pub mod normalize;
pub mod pipeline;
pub mod url;

pub use client::{ScrapeApi, TwitterApi};
pub use error::ExtractError;
pub use pipeline::{DirectSource, ExtractRequest, Extractor, JobSource, RecordSource};
