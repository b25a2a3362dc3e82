#![doc = "spuppy-core: core logic library for spuppy."]

//! This crate holds everything spuppy does apart from argument parsing and the
//! concrete HTTP client: site configuration types, validation of the files to
//! upload, the [`contract::SiteClient`] seam, progress and logging, and the
//! upload orchestration itself.
//!
//! # Usage
//! The `spuppy` binary crate loads configuration, builds an
//! [`request::UploadRequest`] from its flags and hands both to
//! [`upload::upload`] together with a `SiteClient` implementation.

pub mod config;
pub mod contract;
pub mod logging;
pub mod progress;
pub mod request;
pub mod upload;
