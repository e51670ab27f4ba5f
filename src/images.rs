use crate::deck::{Deck, ElementKind};
use crate::error::{GenerationReport, WarnCode};
use crate::locate::Target;
use std::fmt;

/// Origin prepended to root-relative image paths.
pub const DEFAULT_IMAGE_BASE: &str = "https://land.naver.com";

/// Normalizes a raw image reference into a fetchable URL.
/// Empty -> `None`, `//host/p` -> `https://host/p`, `/p` -> base + `/p`,
/// absolute URLs pass through untouched.
pub fn normalize_source(raw: &str, base: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    if raw.starts_with('/') {
        return Some(format!("{}{}", base.trim_end_matches('/'), raw));
    }
    Some(raw.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> FetchError {
        FetchError {
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch failed: {}", self.message)
    }
}

impl std::error::Error for FetchError {}

/// Retrieval of image bytes is delegated so generation itself stays
/// deterministic and network-free. The timeout is a hint; a fetcher that
/// cannot honor it may ignore it.
pub trait ImageFetcher {
    fn fetch(&self, url: &str, timeout_ms: u64) -> Result<Vec<u8>, FetchError>;
}

/// Default fetcher: refuses every URL, so image rules degrade to
/// warnings unless a real fetcher is installed.
pub struct NoFetch;

impl ImageFetcher for NoFetch {
    fn fetch(&self, url: &str, _timeout_ms: u64) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::new(format!("no fetcher configured for {}", url)))
    }
}

/// Validates fetched bytes as a decodable image, stores them as a deck
/// resource, and points the target element at it. The element keeps its
/// name and rect; whatever it was before, it is an image afterwards.
pub fn place_image(
    deck: &mut Deck,
    target: Target,
    source: &str,
    bytes: Vec<u8>,
    report: &mut GenerationReport,
) -> bool {
    let Target::Node(id) = target else {
        report.warn(
            WarnCode::TargetNotText,
            format!("image target for {} is a table cell", source),
        );
        return false;
    };
    if let Err(err) = image::load_from_memory(&bytes) {
        report.warn(
            WarnCode::ImageInvalid,
            format!("{}: {}", source, err),
        );
        return false;
    }
    let content_type = match image::guess_format(&bytes) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        _ => "application/octet-stream",
    };
    let resource = deck.add_resource(content_type, bytes);
    deck.element_mut(id).kind = ElementKind::Image {
        resource: Some(resource),
        source: Some(source.to_string()),
    };
    true
}
