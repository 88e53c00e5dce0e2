//! Scheduled publisher that discovers the latest VIEWS conflict-forecast
//! release, downloads its country-month and PRIO-grid-month data, and
//! reshapes it into HDX-ready dataset descriptors with CSV resources.

pub mod api;
pub mod catalog;
pub mod config;
pub mod datasets;
pub mod dates;
pub mod error;
pub mod locations;
pub mod publish;
pub mod resources;
pub mod retriever;
