//! Social network clients and extractors used by Insight.
//!
//! Only the Twitter/X pipeline exists: URL classification, the scraping API
//! clients, response normalization, and the orchestrator that turns a list of
//! pasted URLs into an [`insight_common::model::ExtractionBatch`].
pub mod twitter;
