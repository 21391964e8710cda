//! Directory entries decoded from listings and response headers
//!
//! Listings and HEAD responses describe the same resource with different
//! spellings (`LastWriteTime` in XML, `x-ms-file-last-write-time` as a
//! header). Both are folded into canonical lower-case underscored keys,
//! then coerced into typed fields through the static [`FIELDS`] table.

use crate::error::{AzfilesError, Result};
use crate::share::path::RemotePath;
use crate::share::xml::{decode_listing, ListingNode};
use crate::utils::datetime::{format_datetime, parse_protocol_datetime};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Prefix carried by file-scoped response headers
pub const FILE_HEADER_PREFIX: &str = "x-ms-file-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    /// Map a listing element name to a kind
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "File" => Some(Self::File),
            "Directory" => Some(Self::Directory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "File",
            Self::Directory => "Directory",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Timestamp,
    Text,
}

/// Canonical fields after `name` and `type`, in rendering order
pub const FIELDS: &[(&str, FieldKind)] = &[
    ("size", FieldKind::Integer),
    ("creation_time", FieldKind::Timestamp),
    ("last_access_time", FieldKind::Timestamp),
    ("last_write_time", FieldKind::Timestamp),
    ("etag", FieldKind::Text),
    ("change_time", FieldKind::Timestamp),
    ("last_modified", FieldKind::Timestamp),
];

/// Canonical keys that feed another field
const ALIASES: &[(&str, &str)] = &[("content_length", "size")];

#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Integer(u64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

/// Fold a protocol property or header name into its canonical key.
///
/// `x-ms-file-last-write-time` and `LastWriteTime` both become
/// `last_write_time`; `Content-Length` becomes `content_length`.
pub fn normalize_key(key: &str) -> String {
    let stripped = match key.get(..FILE_HEADER_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(FILE_HEADER_PREFIX) => &key[FILE_HEADER_PREFIX.len()..],
        _ => key,
    };

    let mut out = String::with_capacity(stripped.len() + 4);
    let mut prev: Option<char> = None;
    for c in stripped.chars() {
        if c == '-' || c == ' ' {
            out.push('_');
        } else {
            let boundary = c.is_ascii_uppercase()
                && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit());
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        }
        prev = Some(c);
    }
    out
}

/// Normalized record for one file or directory
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Absolute path of the entry
    pub path: RemotePath,
    /// Path of the listing this entry came from, unset for stat results
    pub listing_path: Option<RemotePath>,
    pub size: Option<u64>,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_access_time: Option<DateTime<Utc>>,
    pub last_write_time: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub change_time: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl DirectoryEntry {
    fn empty(name: String, kind: EntryKind, path: RemotePath) -> Self {
        Self {
            name,
            kind,
            path,
            listing_path: None,
            size: None,
            creation_time: None,
            last_access_time: None,
            last_write_time: None,
            etag: None,
            change_time: None,
            last_modified: None,
        }
    }

    /// Build an entry from one `<File>`/`<Directory>` node of a listing
    pub fn from_listing_node(listing_path: &RemotePath, node: &ListingNode) -> Result<Self> {
        let kind = EntryKind::from_tag(&node.tag)
            .ok_or_else(|| AzfilesError::xml(format!("unexpected listing entry <{}>", node.tag)))?;
        let name = node
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AzfilesError::xml(format!("<{}> without <Name>", node.tag)))?
            .to_string();

        let mut entry = Self::empty(name.clone(), kind, listing_path.join(&name));
        entry.listing_path = Some(listing_path.clone());
        entry.apply_properties(node.properties.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Ok(entry)
    }

    /// Build an entry from the headers of a HEAD response on `path`
    pub fn from_headers(path: &RemotePath, kind: EntryKind, headers: &[(String, String)]) -> Self {
        let name = path.file_name().unwrap_or("/").to_string();
        let mut entry = Self::empty(name, kind, path.clone());
        entry.apply_properties(headers.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        entry
    }

    fn apply_properties<'a, I>(&mut self, properties: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut bag: HashMap<String, &str> = HashMap::new();
        for (key, value) in properties {
            let mut key = normalize_key(key);
            if let Some((_, target)) = ALIASES.iter().find(|(alias, _)| *alias == key) {
                key = target.to_string();
            }
            bag.insert(key, value.trim());
        }

        for (field, kind) in FIELDS {
            let Some(raw) = bag.get(*field).filter(|v| !v.is_empty()) else {
                continue;
            };
            match coerce(raw, *kind) {
                Some(value) => self.set_field(field, value),
                None => warn!("Ignoring unparseable {} '{}' on {}", field, raw, self.path),
            }
        }

        if self.kind == EntryKind::Directory {
            self.size = None;
        }
    }

    fn set_field(&mut self, field: &str, value: FieldValue) {
        match (field, value) {
            ("size", FieldValue::Integer(n)) => self.size = Some(n),
            ("creation_time", FieldValue::Timestamp(t)) => self.creation_time = Some(t),
            ("last_access_time", FieldValue::Timestamp(t)) => self.last_access_time = Some(t),
            ("last_write_time", FieldValue::Timestamp(t)) => self.last_write_time = Some(t),
            ("change_time", FieldValue::Timestamp(t)) => self.change_time = Some(t),
            ("last_modified", FieldValue::Timestamp(t)) => self.last_modified = Some(t),
            ("etag", FieldValue::Text(s)) => self.etag = Some(s),
            _ => {}
        }
    }

    /// Rendered value of a canonical field, empty when unset
    pub fn field_text(&self, field: &str) -> String {
        let ts = |t: &Option<DateTime<Utc>>| t.as_ref().map(format_datetime).unwrap_or_default();
        match field {
            "name" => self.name.clone(),
            "type" => self.kind.to_string(),
            "size" => self.size.map(|n| n.to_string()).unwrap_or_default(),
            "creation_time" => ts(&self.creation_time),
            "last_access_time" => ts(&self.last_access_time),
            "last_write_time" => ts(&self.last_write_time),
            "change_time" => ts(&self.change_time),
            "last_modified" => ts(&self.last_modified),
            "etag" => self.etag.clone().unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// Comma-joined canonical field names, matching `Display`
    pub fn header() -> String {
        std::iter::once("name")
            .chain(std::iter::once("type"))
            .chain(FIELDS.iter().map(|(name, _)| *name))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

impl fmt::Display for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = std::iter::once("name")
            .chain(std::iter::once("type"))
            .chain(FIELDS.iter().map(|(name, _)| *name))
            .map(|field| self.field_text(field))
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&line)
    }
}

fn coerce(raw: &str, kind: FieldKind) -> Option<FieldValue> {
    match kind {
        FieldKind::Integer => raw.parse::<u64>().ok().map(FieldValue::Integer),
        FieldKind::Timestamp => parse_protocol_datetime(raw).map(FieldValue::Timestamp),
        FieldKind::Text => Some(FieldValue::Text(raw.trim_matches('"').to_string())),
    }
}

/// Entries of one directory, in response order
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryListing {
    pub path: RemotePath,
    entries: Vec<DirectoryEntry>,
}

impl DirectoryListing {
    pub fn new(path: RemotePath) -> Self {
        Self {
            path,
            entries: Vec::new(),
        }
    }

    /// Parse one listing response into a fresh listing
    pub fn from_xml(path: RemotePath, body: &str) -> Result<Self> {
        let mut listing = Self::new(path);
        listing.append_xml(body)?;
        Ok(listing)
    }

    /// Append every entry node of a listing response page.
    ///
    /// Returns the continuation marker when the service has more pages.
    pub fn append_xml(&mut self, body: &str) -> Result<Option<String>> {
        let page = decode_listing(body)?;
        for node in &page.nodes {
            if EntryKind::from_tag(&node.tag).is_none() {
                warn!("Skipping unknown listing node <{}>", node.tag);
                continue;
            }
            self.entries.push(DirectoryEntry::from_listing_node(&self.path, node)?);
        }
        Ok(page.next_marker)
    }

    pub fn get(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn files(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::File)
    }

    pub fn directories(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Directory)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
