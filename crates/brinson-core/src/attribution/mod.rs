//! Brinson attribution: the effect engine and the table collaborators
//! (delimited-text ingestion and export, waterfall chart model).

pub mod engine;

#[cfg(feature = "csv")]
pub mod export;

#[cfg(feature = "csv")]
pub mod ingest;

#[cfg(feature = "chart")]
pub mod waterfall;
