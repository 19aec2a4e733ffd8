//! In-process stand-in for an inverter's web file API.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use serde_json::{json, Value};
use tiny_http::{Header, Response, Server};

pub const RIGHT: &str = "usr";
pub const PASS: &str = "secret";
pub const SID: &str = "mock-sid-1";

/// Deterministic 1024-byte file body.
pub fn file1_contents() -> Vec<u8> {
    (0..1024).map(|i| (i % 251) as u8).collect()
}

enum Listings {
    Tree(HashMap<String, Value>),
    Canned(Value),
}

/// HTTP server in a background thread speaking the device's four endpoints
/// from an in-memory tree, recording every request it sees.
pub struct MockDevice {
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
    requests: Arc<Mutex<Vec<String>>>,
    port: u16,
}

impl MockDevice {
    /// The standard tree: `/DIAGNOSE/file1.txt` (1024 bytes) and
    /// `/SYSLOG/blarg`.
    pub fn standard() -> Self {
        let mut listings = HashMap::new();
        listings.insert(
            "/".to_string(),
            json!([
                {"d": "DIAGNOSE", "tm": 1544715000},
                {"d": "SYSLOG", "tm": 1544715001},
            ]),
        );
        listings.insert(
            "/DIAGNOSE/".to_string(),
            json!([{"f": "file1.txt", "tm": 1544715002, "s": 1024}]),
        );
        listings.insert(
            "/SYSLOG/".to_string(),
            json!([{"f": "blarg", "tm": 1544715003, "s": 5}]),
        );

        let mut files = HashMap::new();
        files.insert("/DIAGNOSE/file1.txt".to_string(), file1_contents());
        files.insert("/SYSLOG/blarg".to_string(), b"blarg".to_vec());

        Self::start(Listings::Tree(listings), files)
    }

    /// A device with the given listings (keyed by the trailing-slashed
    /// request path) and file contents.
    pub fn with_tree(listings: HashMap<String, Value>, files: HashMap<String, Vec<u8>>) -> Self {
        Self::start(Listings::Tree(listings), files)
    }

    /// A device answering every listing request with a fixed body, for
    /// response shapes a well-behaved tree cannot produce.
    pub fn canned_listing(body: Value) -> Self {
        Self::start(Listings::Canned(body), HashMap::new())
    }

    pub fn base(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn request_log(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn start(listings: Listings, files: HashMap<String, Vec<u8>>) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let port = server.server_addr().to_ip().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let srv = server.clone();
        let log = requests.clone();
        let handle = thread::spawn(move || {
            while let Ok(mut req) = srv.recv() {
                log.lock()
                    .unwrap()
                    .push(format!("{} {}", req.method(), req.url()));
                let mut body = String::new();
                let _ = req.as_reader().read_to_string(&mut body);
                let url = req.url().to_string();
                let _ = req.respond(route(&listings, &files, &url, &body));
            }
        });

        Self {
            server,
            handle: Some(handle),
            requests,
            port,
        }
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn route(
    listings: &Listings,
    files: &HashMap<String, Vec<u8>>,
    url: &str,
    body: &str,
) -> Response<Cursor<Vec<u8>>> {
    let (path, query) = match url.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (url, None),
    };
    let authed = query == Some(format!("sid={}", SID).as_str());

    match path {
        "/dyn/login.json" => {
            let req: Value = serde_json::from_str(body).unwrap_or(Value::Null);
            if req["right"] == RIGHT && req["pass"] == PASS {
                json_response(json!({"result": {"sid": SID}}))
            } else {
                json_response(json!({"result": {"sid": null}}))
            }
        }
        "/dyn/logout.json" => {
            if !authed {
                return json_response(json!({"err": 401})).with_status_code(401);
            }
            json_response(json!({"result": {"isLogin": false}}))
        }
        "/dyn/getFS.json" => {
            if !authed {
                return json_response(json!({"err": 401})).with_status_code(401);
            }
            match listings {
                Listings::Canned(v) => json_response(v.clone()),
                Listings::Tree(tree) => {
                    let req: Value = serde_json::from_str(body).unwrap_or(Value::Null);
                    let requested = req["path"].as_str().unwrap_or("");
                    // The firmware echoes the requested path; an unknown
                    // path just yields no path key at all.
                    let mut paths = serde_json::Map::new();
                    if let Some(entries) = tree.get(requested) {
                        paths.insert(requested.to_string(), entries.clone());
                    }
                    json_response(json!({"result": {"mockdev": paths}}))
                }
            }
        }
        _ => match path.strip_prefix("/fs/") {
            Some(rel) if authed => match files.get(&format!("/{}", rel)) {
                Some(data) => Response::from_data(data.clone()),
                None => Response::from_data(Vec::new()).with_status_code(404),
            },
            _ => Response::from_data(Vec::new()).with_status_code(404),
        },
    }
}

fn json_response(v: Value) -> Response<Cursor<Vec<u8>>> {
    let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
    Response::from_string(v.to_string()).with_header(header)
}
