pub mod celebrate;
pub mod config;
pub mod milestone;
pub mod pattern;
pub mod serve;
