use std::path::PathBuf;

/// Errors produced while turning an image into an ICO file.
///
/// Every variant renders as a single line so front ends can show it
/// directly in a status bar.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The source image is missing, unreadable or not a supported raster format.
    #[error("Failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// An ICO file could not be parsed.
    #[error("Malformed icon {}: {reason}", .path.display())]
    MalformedIcon { path: PathBuf, reason: String },

    /// The output directory is missing or cannot be written.
    #[error("Cannot write to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PNG or ICO serialization failed.
    #[error("Failed to encode icon: {0}")]
    Encode(String),

    /// A request field is outside its allowed range.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ConvertError {
    /// Short kind label, used by the CLI's JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode { .. } | Self::MalformedIcon { .. } => "decode",
            Self::Io { .. } => "io",
            Self::Encode(_) => "encode",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedIcon {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
