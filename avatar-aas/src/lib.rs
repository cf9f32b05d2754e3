#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::redundant_pub_crate,
    clippy::future_not_send
)]

pub mod manager;
pub mod model;
mod utils;

pub use utils::{config, error, tracing as telemetry};
