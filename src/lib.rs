pub mod config;
pub mod data;
pub mod username_string;
pub mod clock;
pub mod rng;
pub mod util;
mod lib_constants;
pub mod bin_constants;
pub mod logging;
pub mod metadata;
pub mod blobstore;
pub mod worker;
pub mod service;
pub mod snapshot;
