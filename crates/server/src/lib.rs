//! HTTP surface for the attendance predictor

pub mod api;
pub mod config;
