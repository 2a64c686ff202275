//! Farm advisory form pipeline: a location resolves to weather, which
//! together with manually entered fields gates a prediction request.

pub mod client;
pub mod config;
pub mod constants;
pub mod driver;
pub mod error;
pub mod form;
pub mod formatters;
pub mod models;
pub mod service;
