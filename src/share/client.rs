//! Typed File REST operations on one mount
//!
//! Each operation issues a single request (listing issues one per page)
//! and maps the status: anything at or above 400 is a `ProtocolError`,
//! except for the existence and stat checks where "not there" is an answer.

use crate::config::mounts::Mount;
use crate::error::{AzfilesError, Result};
use crate::share::address::build_url;
use crate::share::chunk::ByteRange;
use crate::share::entry::{DirectoryEntry, DirectoryListing, EntryKind};
use crate::share::path::RemotePath;
use crate::share::transport::{HttpRequest, HttpResponse, Transport};
use futures::StreamExt;
use reqwest::Method;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufWriter};
use tracing::debug;

/// Protocol version sent with every request
pub const API_VERSION: &str = "2020-04-08";

pub const RESTYPE_DIRECTORY: &str = "restype=directory";
pub const LIST_QUERY: &str = "restype=directory&comp=list&include=Timestamps,ETag";
pub const RANGE_QUERY: &str = "comp=range";

pub struct ShareClient {
    transport: Arc<dyn Transport>,
    mount: Mount,
}

impl ShareClient {
    pub fn new(transport: Arc<dyn Transport>, mount: Mount) -> Self {
        Self { transport, mount }
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    fn request(&self, method: Method, path: &RemotePath, query: Option<&str>) -> Result<HttpRequest> {
        let url = build_url(&self.mount, path, query)?;
        Ok(HttpRequest::new(method, url).with_header("x-ms-version", API_VERSION))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method.clone();
        let response = self.transport.send(request).await?;
        debug!("{} -> {}", method, response.status);
        Ok(response)
    }

    fn check(response: HttpResponse, context: String) -> Result<HttpResponse> {
        if response.status >= 400 {
            return Err(AzfilesError::protocol(context, response.status, response.text()));
        }
        Ok(response)
    }

    /// Whether `dir` exists as a directory; 404 is `false`
    pub async fn directory_exists(&self, dir: &RemotePath) -> Result<bool> {
        let request = self.request(Method::HEAD, dir, Some(RESTYPE_DIRECTORY))?;
        let response = self.send(request).await?;
        if response.status == 404 {
            return Ok(false);
        }
        Self::check(response, format!("Can't check directory {dir}: "))?;
        Ok(true)
    }

    /// Properties of a file, `None` unless the service answers 200
    pub async fn stat_file(&self, path: &RemotePath) -> Result<Option<DirectoryEntry>> {
        let request = self.request(Method::HEAD, path, None)?;
        self.stat(request, path, EntryKind::File).await
    }

    /// Properties of a directory, `None` unless the service answers 200
    pub async fn stat_directory(&self, path: &RemotePath) -> Result<Option<DirectoryEntry>> {
        let request = self.request(Method::HEAD, path, Some(RESTYPE_DIRECTORY))?;
        self.stat(request, path, EntryKind::Directory).await
    }

    async fn stat(
        &self,
        request: HttpRequest,
        path: &RemotePath,
        kind: EntryKind,
    ) -> Result<Option<DirectoryEntry>> {
        let response = self.send(request).await?;
        if response.status != 200 {
            debug!("No {} at {} (status {})", kind, path, response.status);
            return Ok(None);
        }
        Ok(Some(DirectoryEntry::from_headers(path, kind, &response.headers)))
    }

    /// Create `path` as a file of `size` bytes, discarding any content it had
    pub async fn clear_file(&self, path: &RemotePath, size: u64) -> Result<()> {
        let request = self
            .request(Method::PUT, path, None)?
            .with_header("x-ms-type", "file")
            .with_header("x-ms-content-length", size.to_string())
            .with_header("x-ms-file-permission", "inherit")
            .with_header("x-ms-file-attributes", "None")
            .with_header("x-ms-file-creation-time", "now")
            .with_header("x-ms-file-last-write-time", "now")
            .with_body(Vec::new());
        let response = self.send(request).await?;
        Self::check(response, format!("Can't clear_file: {path} "))?;
        Ok(())
    }

    /// Write `range` of the local `source` file into the same range of `path`
    pub async fn write_range(&self, path: &RemotePath, range: ByteRange, source: &Path) -> Result<()> {
        let mut file = tokio::fs::File::open(source).await?;
        file.seek(std::io::SeekFrom::Start(range.start)).await?;
        let mut data = vec![0u8; range.len() as usize];
        file.read_exact(&mut data).await?;
        self.write_range_bytes(path, range, data).await
    }

    /// Write `data` (exactly `range.len()` bytes) into `range` of `path`
    pub async fn write_range_bytes(&self, path: &RemotePath, range: ByteRange, data: Vec<u8>) -> Result<()> {
        if data.len() as u64 != range.len() {
            return Err(AzfilesError::invalid_argument(format!(
                "Range {range} needs {} bytes, got {}",
                range.len(),
                data.len()
            )));
        }
        let request = self
            .request(Method::PUT, path, Some(RANGE_QUERY))?
            .with_header("x-ms-range", range.header_value())
            .with_header("x-ms-write", "update")
            .with_body(data);
        let response = self.send(request).await?;
        Self::check(response, format!("Can't upload_file_range: {path}{range} "))?;
        Ok(())
    }

    pub async fn create_directory(&self, dir: &RemotePath) -> Result<()> {
        let request = self
            .request(Method::PUT, dir, Some(RESTYPE_DIRECTORY))?
            .with_header("x-ms-file-permission", "inherit")
            .with_header("x-ms-file-attributes", "Directory")
            .with_header("x-ms-file-creation-time", "now")
            .with_header("x-ms-file-last-write-time", "now")
            .with_body(Vec::new());
        let response = self.send(request).await?;
        Self::check(response, format!("Can't create dir: {dir} "))?;
        Ok(())
    }

    /// Delete an empty directory
    pub async fn delete_directory(&self, dir: &RemotePath) -> Result<()> {
        let request = self.request(Method::DELETE, dir, Some(RESTYPE_DIRECTORY))?;
        let response = self.send(request).await?;
        Self::check(response, format!("Can't delete dir: {dir} "))?;
        Ok(())
    }

    pub async fn delete_file(&self, path: &RemotePath) -> Result<()> {
        let request = self.request(Method::DELETE, path, None)?;
        let response = self.send(request).await?;
        Self::check(response, format!("Can't delete file: {path} "))?;
        Ok(())
    }

    /// List the entries of `dir`, following continuation markers
    pub async fn list_directory(&self, dir: &RemotePath) -> Result<DirectoryListing> {
        let mut listing = DirectoryListing::new(dir.clone());
        let mut marker: Option<String> = None;
        loop {
            let query = match &marker {
                Some(m) => format!("{LIST_QUERY}&marker={}", encode_query_value(m)),
                None => LIST_QUERY.to_string(),
            };
            let request = self
                .request(Method::GET, dir, Some(&query))?
                .with_header("x-ms-file-extended-info", "true");
            let response = self.send(request).await?;
            let response = Self::check(response, format!("Can't list dir: {dir} "))?;

            marker = listing.append_xml(&response.text())?;
            if marker.is_none() {
                break;
            }
            debug!("Listing {} continues at marker {:?}", dir, marker);
        }
        Ok(listing)
    }

    /// Stream the file at `path` into `dest`, returning the bytes written.
    ///
    /// Writes go through a buffer of `buffer_size` bytes. A failure midway
    /// leaves a partial local file.
    pub async fn download(&self, path: &RemotePath, dest: &Path, buffer_size: usize) -> Result<u64> {
        let request = self.request(Method::GET, path, None)?;
        let response = self.transport.send_streaming(request).await?;
        debug!("GET {} -> {}", path, response.status);
        if response.status >= 400 {
            let buffered = response.into_buffered().await?;
            return Err(AzfilesError::protocol(
                format!("Can't download: {path} "),
                buffered.status,
                buffered.text(),
            ));
        }

        let file = tokio::fs::File::create(dest).await?;
        let mut writer = BufWriter::with_capacity(buffer_size.max(1), file);
        let mut body = response.body;
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(written)
    }
}

fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
