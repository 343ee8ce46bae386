pub mod config;
pub mod error;
pub mod features;
pub mod input;
pub mod model;
pub mod serve;
