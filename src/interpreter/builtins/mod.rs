//! Built-in objects the drivers and host programs rely on

pub mod error;
pub mod generator;
pub mod json;
pub mod promise;
