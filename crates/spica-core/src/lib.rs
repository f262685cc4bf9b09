pub mod archive;
pub mod cleaning;
pub mod config;
pub mod correction;
pub mod error;
pub mod lightcurve;
pub mod periodogram;
pub mod pipeline;
pub mod render;
pub mod statistics;
pub mod targets;
