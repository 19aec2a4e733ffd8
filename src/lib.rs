//! Mount an SMA inverter's web file store as a read-only filesystem.
//!
//! The inverter's "webconnect" firmware serves directory listings and file
//! contents over an authenticated HTTP/JSON API. [`SmaApi`] speaks that
//! protocol; [`SmaFs`] projects it through FUSE so ordinary tools can browse
//! the device. Nothing is cached: every listing and every open asks the
//! device again.

pub mod api;
pub mod common;
pub mod fuse;
pub mod ino;

pub use api::{FsEntry, SmaApi};
pub use common::{Error, Result};
pub use fuse::SmaFs;
