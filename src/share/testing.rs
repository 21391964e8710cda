//! In-memory stand-in for a file share, used by unit tests
//!
//! Implements [`Transport`] by interpreting the File REST requests the
//! client sends against a map of directories and files, and records each
//! request so tests can assert on counts and order.

use crate::config::mounts::Mount;
use crate::error::Result;
use crate::share::path::RemotePath;
use crate::share::transport::{HttpRequest, HttpResponse, StreamingResponse, Transport};
use async_trait::async_trait;
use futures::StreamExt;
use percent_encoding::percent_decode_str;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

const CREATED: &str = "2024-01-02T03:04:05.1234567Z";
const MODIFIED: &str = "Tue, 02 Jan 2024 03:04:05 GMT";

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub version: Option<String>,
    pub range: Option<String>,
    pub body_len: usize,
}

impl RecordedRequest {
    /// Short `METHOD path?query` form for asserting call sequences
    pub fn summary(&self) -> String {
        match &self.query {
            Some(q) => format!("{} {}?{}", self.method, self.path, q),
            None => format!("{} {}", self.method, self.path),
        }
    }
}

#[derive(Default)]
struct State {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    log: Vec<RecordedRequest>,
    failure: Option<(u16, String)>,
    range_failure: Option<(usize, u16, String)>,
}

pub struct FakeShare {
    state: Mutex<State>,
    page_size: usize,
}

impl FakeShare {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 5000,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn mount() -> Mount {
        Mount::new("acct", "share", "sv=2020&sig=fake")
    }

    pub fn add_directory(&self, path: &str) {
        let path = RemotePath::parse(path);
        let mut state = self.state.lock().unwrap();
        for ancestor in path.ancestors() {
            state.dirs.insert(ancestor.to_string());
        }
        if !path.is_root() {
            state.dirs.insert(path.to_string());
        }
    }

    pub fn add_file(&self, path: &str, content: &[u8]) {
        let path = RemotePath::parse(path);
        self.add_directory(&path.parent().to_string());
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), content.to_vec());
    }

    /// Answer every following request with this status and body
    pub fn fail_with(&self, status: u16, body: &str) {
        self.state.lock().unwrap().failure = Some((status, body.to_string()));
    }

    /// Fail only the range write that starts at `offset`
    pub fn fail_range_at(&self, offset: u64, status: u16, body: &str) {
        self.state.lock().unwrap().range_failure = Some((offset as usize, status, body.to_string()));
    }

    pub fn has_directory(&self, path: &str) -> bool {
        let path = RemotePath::parse(path);
        path.is_root() || self.state.lock().unwrap().dirs.contains(&path.to_string())
    }

    pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        let path = RemotePath::parse(path).to_string();
        self.state.lock().unwrap().files.get(&path).cloned()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn request_summaries(&self) -> Vec<String> {
        self.requests().iter().map(RecordedRequest::summary).collect()
    }

    pub fn clear_requests(&self) {
        self.state.lock().unwrap().log.clear();
    }

    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let mut segments = request
            .url
            .path_segments()
            .map(|s| s.map(|seg| percent_decode_str(seg).decode_utf8_lossy().into_owned()).collect::<Vec<_>>())
            .unwrap_or_default();
        if !segments.is_empty() {
            segments.remove(0);
        }
        let path = RemotePath::from_components(&segments);
        let key = path.to_string();

        let pairs: Vec<(String, String)> = request
            .url
            .query_pairs()
            .filter(|(k, _)| k != "sig" && k != "sv")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let query: HashMap<&str, &str> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let query_text = (!pairs.is_empty()).then(|| {
            pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&")
        });

        let mut state = self.state.lock().unwrap();
        state.log.push(RecordedRequest {
            method: request.method.to_string(),
            path: key.clone(),
            query: query_text,
            version: request.header("x-ms-version").map(str::to_string),
            range: request.header("x-ms-range").map(str::to_string),
            body_len: request.body.as_ref().map(Vec::len).unwrap_or(0),
        });

        if let Some((status, body)) = &state.failure {
            return respond(*status, body);
        }

        let is_dir_op = query.get("restype") == Some(&"directory");
        match (request.method.as_str(), is_dir_op, query.get("comp").copied()) {
            ("HEAD", true, None) => {
                if dir_exists(&state, &path) {
                    with_properties(HttpResponse::new(200), None)
                } else {
                    respond(404, "ResourceNotFound")
                }
            }
            ("HEAD", false, None) => match state.files.get(&key) {
                Some(content) => {
                    let mut response = with_properties(HttpResponse::new(200), Some(content.len()));
                    response.headers.push(("x-ms-type".into(), "File".into()));
                    response
                }
                None => respond(404, "ResourceNotFound"),
            },
            ("PUT", true, None) => {
                if !dir_exists(&state, &path.parent()) {
                    respond(404, "ParentNotFound")
                } else if dir_exists(&state, &path) || state.files.contains_key(&key) {
                    respond(409, "ResourceAlreadyExists")
                } else {
                    state.dirs.insert(key);
                    respond(201, "")
                }
            }
            ("PUT", false, None) => {
                let size = request
                    .header("x-ms-content-length")
                    .and_then(|v| v.parse::<usize>().ok());
                match size {
                    None => respond(400, "MissingRequiredHeader"),
                    Some(_) if !dir_exists(&state, &path.parent()) => respond(404, "ParentNotFound"),
                    Some(_) if dir_exists(&state, &path) => respond(409, "ResourceTypeMismatch"),
                    Some(size) => {
                        state.files.insert(key, vec![0u8; size]);
                        respond(201, "")
                    }
                }
            }
            ("PUT", false, Some("range")) => {
                let body = request.body.clone().unwrap_or_default();
                let Some((start, end)) = request.header("x-ms-range").and_then(parse_range) else {
                    return respond(400, "InvalidHeaderValue");
                };
                if let Some((_, status, code)) = state.range_failure.as_ref().filter(|(at, _, _)| *at == start) {
                    return respond(*status, code);
                }
                let Some(content) = state.files.get_mut(&key) else {
                    return respond(404, "ResourceNotFound");
                };
                if end < start || end - start + 1 != body.len() {
                    return respond(400, "InvalidRange");
                }
                if end >= content.len() {
                    return respond(416, "InvalidRange");
                }
                content[start..=end].copy_from_slice(&body);
                respond(201, "")
            }
            ("DELETE", true, None) => {
                if path.is_root() || !state.dirs.contains(&key) {
                    return respond(404, "ResourceNotFound");
                }
                let has_children = state
                    .dirs
                    .iter()
                    .chain(state.files.keys())
                    .any(|k| RemotePath::parse(k).parent() == path);
                if has_children {
                    return respond(409, "DirectoryNotEmpty");
                }
                state.dirs.remove(&key);
                respond(202, "")
            }
            ("DELETE", false, None) => match state.files.remove(&key) {
                Some(_) => respond(202, ""),
                None => respond(404, "ResourceNotFound"),
            },
            ("GET", true, Some("list")) => {
                if !dir_exists(&state, &path) {
                    return respond(404, "ResourceNotFound");
                }
                let offset = query
                    .get("marker")
                    .and_then(|m| m.parse::<usize>().ok())
                    .unwrap_or(0);
                self.listing(&state, &path, offset)
            }
            ("GET", false, None) => match state.files.get(&key) {
                Some(content) => {
                    let mut response = HttpResponse::new(200);
                    response.body = content.clone();
                    response
                }
                None => respond(404, "ResourceNotFound"),
            },
            _ => respond(400, "UnsupportedHttpVerb"),
        }
    }

    fn listing(&self, state: &State, dir: &RemotePath, offset: usize) -> HttpResponse {
        let mut children: Vec<(bool, String, usize)> = Vec::new();
        for d in &state.dirs {
            let p = RemotePath::parse(d);
            if p.parent() == *dir && p != *dir {
                children.push((true, p.file_name().unwrap_or_default().to_string(), 0));
            }
        }
        for (f, content) in &state.files {
            let p = RemotePath::parse(f);
            if p.parent() == *dir {
                children.push((false, p.file_name().unwrap_or_default().to_string(), content.len()));
            }
        }

        let page: Vec<_> = children.iter().skip(offset).take(self.page_size).collect();
        let next = offset + page.len();

        let mut xml = String::from("\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>");
        xml.push_str("<EnumerationResults ServiceEndpoint=\"https://acct.file.core.windows.net/\" ShareName=\"share\">");
        xml.push_str("<Entries>");
        for (is_dir, name, len) in page {
            let name = escape(name);
            if *is_dir {
                xml.push_str(&format!(
                    "<Directory><Name>{name}</Name><Properties><CreationTime>{CREATED}</CreationTime>\
                     <LastWriteTime>{CREATED}</LastWriteTime><Etag>\"0x8D00000000000000\"</Etag>\
                     </Properties></Directory>"
                ));
            } else {
                xml.push_str(&format!(
                    "<File><Name>{name}</Name><Properties><Content-Length>{len}</Content-Length>\
                     <CreationTime>{CREATED}</CreationTime><LastAccessTime>{CREATED}</LastAccessTime>\
                     <LastWriteTime>{CREATED}</LastWriteTime><ChangeTime>{CREATED}</ChangeTime>\
                     <Last-Modified>{MODIFIED}</Last-Modified><Etag>\"0x8D{len:014X}\"</Etag>\
                     </Properties></File>"
                ));
            }
        }
        xml.push_str("</Entries>");
        if next < children.len() {
            xml.push_str(&format!("<NextMarker>{next}</NextMarker>"));
        } else {
            xml.push_str("<NextMarker />");
        }
        xml.push_str("</EnumerationResults>");

        let mut response = HttpResponse::new(200);
        response.body = xml.into_bytes();
        response
    }
}

impl Default for FakeShare {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for FakeShare {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        Ok(self.handle(&request))
    }

    async fn send_streaming(&self, request: HttpRequest) -> Result<StreamingResponse> {
        let response = self.handle(&request);
        let chunks: Vec<Result<Vec<u8>>> = response.body.chunks(4096).map(|c| Ok(c.to_vec())).collect();
        Ok(StreamingResponse {
            status: response.status,
            headers: response.headers,
            body: futures::stream::iter(chunks).boxed(),
        })
    }
}

fn dir_exists(state: &State, path: &RemotePath) -> bool {
    path.is_root() || state.dirs.contains(&path.to_string())
}

fn respond(status: u16, body: &str) -> HttpResponse {
    let mut response = HttpResponse::new(status);
    if !body.is_empty() {
        response.body = format!("<Error><Code>{body}</Code></Error>").into_bytes();
    }
    response
}

fn with_properties(mut response: HttpResponse, len: Option<usize>) -> HttpResponse {
    let etag = format!("\"0x8D{:014X}\"", len.unwrap_or(0));
    response.headers.extend([
        ("ETag".to_string(), etag),
        ("Last-Modified".to_string(), MODIFIED.to_string()),
        ("x-ms-file-creation-time".to_string(), CREATED.to_string()),
        ("x-ms-file-last-write-time".to_string(), CREATED.to_string()),
        ("x-ms-file-change-time".to_string(), CREATED.to_string()),
    ]);
    if let Some(len) = len {
        response.headers.push(("Content-Length".to_string(), len.to_string()));
    }
    response
}

fn parse_range(value: &str) -> Option<(usize, usize)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
