pub mod api;
pub mod clean;
pub mod config;
pub mod error;
pub mod harvester;
pub mod pipeline;
pub mod query;
pub mod readable;
pub mod reducer;
pub mod render;
pub mod sanitize;
