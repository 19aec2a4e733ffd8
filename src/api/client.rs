//! Client for the device's session and file-store endpoints.

use crate::{
    api::types::{FsEntry, FsRequest, FsResponse, LoginRequest, LoginResponse, LogoutResponse},
    common::{ensure_trailing_slash, paths_equivalent, Error, Result},
};
use bytes::Bytes;
use reqwest::Client;

/// Client for one device endpoint.
///
/// Construction never touches the network. A session is established with
/// [`SmaApi::login`]; the returned token is passed explicitly to every
/// other call.
#[derive(Clone)]
pub struct SmaApi {
    base: String,
    http: Client,
}

impl SmaApi {
    /// Create a client for `base` (`scheme://host[:port]`).
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Create a client, optionally accepting untrusted TLS certificates.
    ///
    /// Device firmware ships a self-signed certificate, so a mount over
    /// https usually needs `insecure`.
    pub fn with_tls_config(base: &str, insecure: bool) -> Result<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| Error::Transfer(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Authenticate with an access profile and password, returning the
    /// session token.
    ///
    /// Every failure mode means the same thing to a caller: no usable
    /// session.
    pub async fn login(&self, right: &str, pass: &str) -> Result<String> {
        let body = serde_json::to_string(&LoginRequest { right, pass })?;
        let text = self
            .post_json("/dyn/login.json", None, body)
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;
        let resp: LoginResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Auth(format!("unexpected login response: {}", e)))?;
        match resp.result.sid {
            Some(sid) if !sid.is_empty() => Ok(sid),
            _ => Err(Error::Auth("no session id in login response".to_string())),
        }
    }

    /// Terminate a session. Returns whether the device confirmed the
    /// session is gone.
    pub async fn logout(&self, sid: &str) -> Result<bool> {
        let text = self
            .post_json("/dyn/logout.json", Some(sid), "{}".to_string())
            .await?;
        let resp: LogoutResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Protocol(format!("unexpected logout response: {}", e)))?;
        Ok(!resp.result.is_login)
    }

    /// List the directory at `path`.
    ///
    /// The firmware echoes back the device serial and the listed path; a
    /// response naming anything but exactly one device and exactly the
    /// requested path is rejected.
    pub async fn get_fs(&self, sid: &str, path: &str) -> Result<Vec<FsEntry>> {
        let requested = ensure_trailing_slash(path);
        let body = serde_json::to_string(&FsRequest {
            dest_dev: Vec::new(),
            path: &requested,
        })?;
        let text = self.post_json("/dyn/getFS.json", Some(sid), body).await?;
        let resp: FsResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Protocol(format!("unexpected listing response: {}", e)))?;

        let mut devices = resp.result.into_iter();
        let (_, paths) = devices
            .next()
            .ok_or_else(|| Error::Protocol("listing names no device".to_string()))?;
        if devices.next().is_some() {
            return Err(Error::Protocol(
                "listing names more than one device".to_string(),
            ));
        }

        let mut paths = paths.into_iter();
        let (reported, entries) = paths
            .next()
            .ok_or_else(|| Error::Protocol(format!("no listing for {}", path)))?;
        if paths.next().is_some() {
            return Err(Error::Protocol(format!(
                "more than one listing for {}",
                path
            )));
        }
        if !paths_equivalent(&reported, path) {
            return Err(Error::Protocol(format!(
                "listing reports path {} for request {}",
                reported, path
            )));
        }
        Ok(entries)
    }

    /// Download a file's entire contents.
    pub async fn download(&self, sid: &str, path: &str) -> Result<Bytes> {
        let rel = path.strip_prefix('/').unwrap_or(path);
        let url = format!("{}/fs/{}?sid={}", self.base, rel, sid);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Transfer(format!("GET /fs/{}: {}", rel, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transfer(format!("GET /fs/{}: status {}", rel, status)));
        }
        response
            .bytes()
            .await
            .map_err(|e| Error::Transfer(format!("GET /fs/{}: {}", rel, e)))
    }

    async fn post_json(&self, endpoint: &str, sid: Option<&str>, body: String) -> Result<String> {
        let mut url = format!("{}{}", self.base, endpoint);
        if let Some(sid) = sid {
            url.push_str("?sid=");
            url.push_str(sid);
        }
        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json;charset=UTF-8")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transfer(format!("POST {}: {}", endpoint, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transfer(format!(
                "POST {}: status {}",
                endpoint, status
            )));
        }
        response
            .text()
            .await
            .map_err(|e| Error::Transfer(format!("POST {}: {}", endpoint, e)))
    }
}
