//! Wire types for the device's `/dyn` JSON endpoints.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub right: &'a str,
    pub pass: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct LoginResponse {
    pub result: LoginResult,
}

#[derive(Deserialize)]
pub(crate) struct LoginResult {
    #[serde(default)]
    pub sid: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LogoutResponse {
    pub result: LogoutResult,
}

#[derive(Deserialize)]
pub(crate) struct LogoutResult {
    #[serde(rename = "isLogin")]
    pub is_login: bool,
}

#[derive(Serialize)]
pub(crate) struct FsRequest<'a> {
    #[serde(rename = "destDev")]
    pub dest_dev: Vec<String>,
    pub path: &'a str,
}

/// Listing response: one device key, under it one path key, under that the
/// entries. Both keys are echoed by the firmware, not chosen by us.
#[derive(Deserialize)]
pub(crate) struct FsResponse {
    pub result: HashMap<String, HashMap<String, Vec<FsEntry>>>,
}

/// One entry of a remote directory listing.
///
/// A well-formed entry names either a file or a directory; the firmware
/// emits the unused name as an empty string, which counts as unset.
#[derive(Debug, Clone, Deserialize)]
pub struct FsEntry {
    #[serde(rename = "f", default)]
    file: String,
    #[serde(rename = "d", default)]
    dir: String,
    /// Modification time in unix seconds.
    #[serde(rename = "tm", default)]
    pub modified: u64,
    /// Size in bytes; zero for directories.
    #[serde(rename = "s", default)]
    pub size: u64,
}

impl FsEntry {
    /// File name, if this entry is a file.
    pub fn file_name(&self) -> Option<&str> {
        if self.file.is_empty() {
            None
        } else {
            Some(&self.file)
        }
    }

    /// Directory name, if this entry is a directory.
    pub fn dir_name(&self) -> Option<&str> {
        if self.dir.is_empty() {
            None
        } else {
            Some(&self.dir)
        }
    }

    /// Entry name regardless of kind. The file name wins if the firmware
    /// ever sets both.
    pub fn name(&self) -> Option<&str> {
        self.file_name().or_else(|| self.dir_name())
    }

    pub fn is_file(&self) -> bool {
        self.file_name().is_some()
    }
}
