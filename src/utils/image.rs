//! Describing image references returned by the generation endpoint.
//!
//! The terminal cannot draw the picture, so the transcript shows a one-line
//! description instead: the URL as-is, or the media type and decoded size of
//! an inline `data:` URI.

use base64::Engine as _;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Url(String),
    Inline { media_type: String, bytes: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRefError {
    Empty,
    MissingComma,
    NotBase64,
    InvalidBase64(String),
}

impl fmt::Display for ImageRefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRefError::Empty => write!(f, "image reference is empty"),
            ImageRefError::MissingComma => write!(f, "data URI has no payload separator"),
            ImageRefError::NotBase64 => write!(f, "data URI payload is not base64 encoded"),
            ImageRefError::InvalidBase64(reason) => {
                write!(f, "data URI payload is not valid base64: {reason}")
            }
        }
    }
}

impl Error for ImageRefError {}

impl ImageRef {
    pub fn parse(reference: &str) -> Result<Self, ImageRefError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ImageRefError::Empty);
        }
        let Some(rest) = reference.strip_prefix("data:") else {
            return Ok(ImageRef::Url(reference.to_string()));
        };

        let (header, data) = rest.split_once(',').ok_or(ImageRefError::MissingComma)?;
        let mut params = header.split(';');
        let media_type = params
            .next()
            .filter(|media_type| !media_type.is_empty())
            .unwrap_or("application/octet-stream")
            .to_string();
        if !params.any(|param| param.eq_ignore_ascii_case("base64")) {
            return Err(ImageRefError::NotBase64);
        }

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|err| ImageRefError::InvalidBase64(err.to_string()))?;
        Ok(ImageRef::Inline {
            media_type,
            bytes: decoded.len(),
        })
    }

    pub fn describe(&self) -> String {
        match self {
            ImageRef::Url(url) => url.clone(),
            ImageRef::Inline { media_type, bytes } => {
                format!("inline {media_type}, {}", format_size(*bytes))
            }
        }
    }
}

fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let size = bytes as f64;
    if size >= MB {
        format!("{:.1} MB", size / MB)
    } else if size >= KB {
        format!("{:.1} KB", size / KB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_pass_through() {
        let image = ImageRef::parse(" https://img.example/cat.png ").expect("url");
        assert_eq!(image, ImageRef::Url("https://img.example/cat.png".to_string()));
        assert_eq!(image.describe(), "https://img.example/cat.png");
    }

    #[test]
    fn data_uri_is_summarised() {
        let image = ImageRef::parse("data:image/png;base64,aGVsbG8=").expect("data uri");
        assert_eq!(
            image,
            ImageRef::Inline {
                media_type: "image/png".to_string(),
                bytes: 5
            }
        );
        assert_eq!(image.describe(), "inline image/png, 5 B");
    }

    #[test]
    fn malformed_data_uris_are_errors() {
        assert_eq!(ImageRef::parse(""), Err(ImageRefError::Empty));
        assert_eq!(
            ImageRef::parse("data:image/png;base64"),
            Err(ImageRefError::MissingComma)
        );
        assert_eq!(
            ImageRef::parse("data:image/svg+xml,<svg/>"),
            Err(ImageRefError::NotBase64)
        );
        assert!(matches!(
            ImageRef::parse("data:image/png;base64,@@@"),
            Err(ImageRefError::InvalidBase64(_))
        ));
    }

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
