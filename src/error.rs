use thiserror::Error;

/// Main error type for azfiles operations
#[derive(Debug, Error)]
pub enum AzfilesError {
    #[error("Malformed reference '{0}': expected <mount>:<path>")]
    MalformedReference(String),

    #[error("Cannot derive remote file from local path '{local}': it is outside the current directory '{cwd}'")]
    PathOutsideWorkingDirectory { local: String, cwd: String },

    #[error("Remote file for '{0}' is not resolved yet")]
    UnresolvedPath(String),

    #[error("{context}status: {status}\n{body}")]
    ProtocolError {
        context: String,
        status: u16,
        body: String,
    },

    #[error("Mount '{mount}' is invalid: '{field}' must not be empty")]
    InvalidMountConfig { mount: String, field: String },

    #[error("Mount not found: {name}")]
    MountNotFound { name: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed XML response: {0}")]
    XmlError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl AzfilesError {
    pub fn malformed_reference<S: Into<String>>(reference: S) -> Self {
        Self::MalformedReference(reference.into())
    }

    pub fn unresolved_path<S: Into<String>>(location: S) -> Self {
        Self::UnresolvedPath(location.into())
    }

    pub fn protocol<S: Into<String>, B: Into<String>>(context: S, status: u16, body: B) -> Self {
        Self::ProtocolError {
            context: context.into(),
            status,
            body: body.into(),
        }
    }

    pub fn invalid_mount<S: Into<String>>(mount: S, field: S) -> Self {
        Self::InvalidMountConfig {
            mount: mount.into(),
            field: field.into(),
        }
    }

    pub fn mount_not_found<S: Into<String>>(name: S) -> Self {
        Self::MountNotFound { name: name.into() }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn xml<S: Into<String>>(msg: S) -> Self {
        Self::XmlError(msg.into())
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::NetworkError(msg.into())
    }

    /// HTTP status carried by a protocol failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ProtocolError { status, .. } => Some(*status),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for azfiles operations
pub type Result<T> = std::result::Result<T, AzfilesError>;
