#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::redundant_pub_crate,
    clippy::future_not_send
)]

pub mod assets;
pub mod errors;
pub mod geometry;
pub mod parts;
pub mod rendering;

#[cfg(test)]
pub(crate) mod test_utils;
