//! Client-side upload/download workflow.
//!
//! Mirrors what the browser dashboard does: collect spreadsheet files, submit
//! them to the gateway with a simulated progress indicator, then download the
//! processed result. File saving and HTTP transport sit behind traits so the
//! controller runs (and tests) without a browser or network.
pub mod batch;
pub mod controller;
pub mod progress;
pub mod save;
pub mod transport;
