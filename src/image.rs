//! Classification of caller-supplied image references into the wire `Image`

use crate::error::{Error, Result};
use crate::rpc;
use std::fmt::Debug;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Scheme of Google Cloud Storage URLs
const GCS_SCHEME: &str = "gs";

/// Anything a caller may hand over as "the image"
pub enum ImageReference {
    /// A local path or a URI, decided at classification time
    Location(String),

    /// A local path
    Path(PathBuf),

    /// An open file. Rewound and read in full whatever its cursor position
    File(File),

    /// Any other byte source. Read from its current position to the end,
    /// since it may not be seekable
    Handle(Box<dyn Read + Send>),
}

impl Debug for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageReference::Location(s) => f.debug_tuple("Location").field(s).finish(),
            ImageReference::Path(p) => f.debug_tuple("Path").field(p).finish(),
            ImageReference::File(file) => f.debug_tuple("File").field(file).finish(),
            ImageReference::Handle(_) => write!(f, "Handle(<reader>)"),
        }
    }
}

impl From<&str> for ImageReference {
    fn from(s: &str) -> Self {
        ImageReference::Location(s.to_string())
    }
}

impl From<String> for ImageReference {
    fn from(s: String) -> Self {
        ImageReference::Location(s)
    }
}

impl From<&Path> for ImageReference {
    fn from(p: &Path) -> Self {
        ImageReference::Path(p.to_path_buf())
    }
}

impl From<PathBuf> for ImageReference {
    fn from(p: PathBuf) -> Self {
        ImageReference::Path(p)
    }
}

impl From<File> for ImageReference {
    fn from(file: File) -> Self {
        ImageReference::File(file)
    }
}

/// A classified image: inline bytes or a remote locator, never both
#[derive(Clone, PartialEq, Eq)]
pub enum ImagePayload {
    Content(Vec<u8>),
    ImageUri(String),
    GcsImageUri(String),
}

impl Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImagePayload::Content(bytes) => write!(f, "Content(<{} bytes>)", bytes.len()),
            ImagePayload::ImageUri(uri) => f.debug_tuple("ImageUri").field(uri).finish(),
            ImagePayload::GcsImageUri(uri) => f.debug_tuple("GcsImageUri").field(uri).finish(),
        }
    }
}

impl From<ImagePayload> for rpc::Image {
    fn from(payload: ImagePayload) -> rpc::Image {
        match payload {
            ImagePayload::Content(content) => rpc::Image {
                content,
                source: None,
            },
            ImagePayload::ImageUri(image_uri) => rpc::Image {
                content: vec![],
                source: Some(rpc::ImageSource {
                    image_uri,
                    gcs_image_uri: String::new(),
                }),
            },
            ImagePayload::GcsImageUri(gcs_image_uri) => rpc::Image {
                content: vec![],
                source: Some(rpc::ImageSource {
                    image_uri: String::new(),
                    gcs_image_uri,
                }),
            },
        }
    }
}

/// Classify one reference.
///
/// An existing regular file always wins over URI parsing, so a relative path
/// such as `a:b.jpg` is read from disk when present and treated as a URI with
/// scheme `a` otherwise.
pub fn classify(reference: ImageReference) -> Result<ImagePayload> {
    match reference {
        ImageReference::File(mut file) => {
            let mut content = Vec::new();
            file.seek(SeekFrom::Start(0))
                .and_then(|_| file.read_to_end(&mut content))
                .map_err(Error::ReadHandle)?;
            debug!("read {} bytes from open file", content.len());
            Ok(ImagePayload::Content(content))
        }
        ImageReference::Handle(mut reader) => {
            let mut content = Vec::new();
            reader
                .read_to_end(&mut content)
                .map_err(Error::ReadHandle)?;
            debug!("read {} bytes from image handle", content.len());
            Ok(ImagePayload::Content(content))
        }
        ImageReference::Path(path) => match path.to_str() {
            Some(s) if !path.is_file() => classify_uri(s),
            Some(_) | None => read_file(&path),
        },
        ImageReference::Location(location) => {
            let path = Path::new(&location);
            if path.is_file() {
                read_file(path)
            } else {
                classify_uri(&location)
            }
        }
    }
}

fn read_file(path: &Path) -> Result<ImagePayload> {
    if !path.is_file() {
        return Err(Error::InvalidImageReference(path.display().to_string()));
    }
    let content = std::fs::read(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("read {} bytes from {}", content.len(), path.display());
    Ok(ImagePayload::Content(content))
}

fn classify_uri(location: &str) -> Result<ImagePayload> {
    let uri = Url::parse(location)
        .map_err(|_| Error::InvalidImageReference(location.to_string()))?;
    let payload = match uri.scheme() {
        GCS_SCHEME => ImagePayload::GcsImageUri(location.to_string()),
        _ => ImagePayload::ImageUri(location.to_string()),
    };
    debug!("classified {location} as {payload:?}");
    Ok(payload)
}
