pub mod client;
pub mod types;

pub use client::SmaApi;
pub use types::FsEntry;
