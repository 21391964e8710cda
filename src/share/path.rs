//! Absolute POSIX-style paths inside a file share
//!
//! Every remote path handled by the crate is normalized on construction:
//! it always starts with `/`, never ends with one (except the root itself),
//! and contains no empty or `.` components.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemotePath {
    parts: Vec<String>,
}

impl RemotePath {
    /// The share root, `/`
    pub fn root() -> Self {
        Self { parts: Vec::new() }
    }

    /// Normalize any path string into an absolute remote path.
    ///
    /// A missing leading separator is prepended, duplicate separators and
    /// `.` components are dropped. `..` is kept as a literal component since
    /// the service has no notion of it; callers reject it where it matters.
    pub fn parse(path: &str) -> Self {
        let parts = path
            .split('/')
            .filter(|p| !p.is_empty() && *p != ".")
            .map(str::to_string)
            .collect();
        Self { parts }
    }

    /// Build a path from already-split components
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = Self::root();
        for c in components {
            path = path.join(c.as_ref());
        }
        path
    }

    pub fn is_root(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.parts.len()
    }

    /// Final component, `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        self.parts.last().map(String::as_str)
    }

    /// Parent directory; the root is its own parent
    pub fn parent(&self) -> Self {
        let mut parts = self.parts.clone();
        parts.pop();
        Self { parts }
    }

    /// Append a relative path (which may itself contain separators)
    pub fn join(&self, child: &str) -> Self {
        let mut parts = self.parts.clone();
        parts.extend(
            child
                .split('/')
                .filter(|p| !p.is_empty() && *p != ".")
                .map(str::to_string),
        );
        Self { parts }
    }

    /// Ancestors from the immediate parent upward, excluding the root
    pub fn ancestors(&self) -> impl Iterator<Item = RemotePath> + '_ {
        (1..self.parts.len()).rev().map(move |n| Self {
            parts: self.parts[..n].to_vec(),
        })
    }

    /// Whether any component is a `..` reference
    pub fn has_parent_reference(&self) -> bool {
        self.parts.iter().any(|p| p == "..")
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.is_empty() {
            return f.write_str("/");
        }
        for part in &self.parts {
            write!(f, "/{part}")?;
        }
        Ok(())
    }
}
