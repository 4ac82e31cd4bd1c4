//! HyP3 product transfer
//!
//! This library copies the GeoTIFF outputs of HyP3 RTC jobs from the HyP3
//! content bucket into a destination bucket. Destination keys replace each
//! job's id with its project name, and files already present are skipped.

pub mod config;
pub mod models;
pub mod services;
