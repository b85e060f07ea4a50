//! Resource types for embedded media parts.

use serde::{Deserialize, Serialize};

/// An embedded package part (usually a picture).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Raw binary data
    #[serde(skip_serializing, default)]
    pub data: Vec<u8>,

    /// MIME type (e.g., "image/jpeg")
    pub mime_type: String,

    /// Resource type
    pub resource_type: ResourceType,

    /// Package-relative part name (e.g., "media/image1.png")
    pub filename: Option<String>,
}

impl Resource {
    /// Create a new resource.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            resource_type,
            filename: None,
        }
    }

    /// Create an image resource.
    pub fn image(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self::new(data, mime_type, ResourceType::Image)
    }

    /// Create a resource from a package part, inferring its MIME type.
    ///
    /// The part name's extension wins; unknown extensions fall back to
    /// sniffing the magic bytes.
    pub fn from_part(part_name: &str, data: Vec<u8>) -> Self {
        let mime = Self::mime_from_name(part_name)
            .or_else(|| Self::detect_mime_type(&data))
            .unwrap_or("application/octet-stream");
        let resource_type = if mime.starts_with("image/") {
            ResourceType::Image
        } else {
            ResourceType::Other
        };
        Self::new(data, mime, resource_type).with_filename(part_name)
    }

    /// Set filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Get the size of the resource data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if this is an image resource.
    pub fn is_image(&self) -> bool {
        matches!(self.resource_type, ResourceType::Image)
    }

    /// File extension used when the image is written out.
    ///
    /// Defaults to `png` for pictures of unknown encoding.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            "image/tiff" => "tiff",
            "image/webp" => "webp",
            "image/x-emf" => "emf",
            "image/x-wmf" => "wmf",
            _ => "png",
        }
    }

    /// MIME type implied by a part name's extension.
    pub fn mime_from_name(name: &str) -> Option<&'static str> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "gif" => Some("image/gif"),
            "bmp" => Some("image/bmp"),
            "tif" | "tiff" => Some("image/tiff"),
            "webp" => Some("image/webp"),
            "emf" => Some("image/x-emf"),
            "wmf" => Some("image/x-wmf"),
            _ => None,
        }
    }

    /// Detect MIME type from data magic bytes.
    pub fn detect_mime_type(data: &[u8]) -> Option<&'static str> {
        if data.len() < 8 {
            return None;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some("image/jpeg");
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some("image/png");
        }

        // GIF: GIF87a or GIF89a
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some("image/gif");
        }

        // BMP: BM
        if data.starts_with(b"BM") {
            return Some("image/bmp");
        }

        // TIFF: 49 49 2A 00 (little-endian) or 4D 4D 00 2A (big-endian)
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00])
            || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Some("image/tiff");
        }

        // WEBP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some("image/webp");
        }

        None
    }
}

/// Type of embedded resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Picture (PNG, JPEG, etc.)
    Image,
    /// Anything else (OLE objects, unknown parts)
    Other,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Image => write!(f, "image"),
            ResourceType::Other => write!(f, "other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_part_by_extension() {
        let res = Resource::from_part("media/image3.JPEG", vec![0u8; 4]);
        assert!(res.is_image());
        assert_eq!(res.extension(), "jpg");
        assert_eq!(res.filename.as_deref(), Some("media/image3.JPEG"));
    }

    #[test]
    fn test_from_part_sniffs_unknown_extension() {
        let gif = b"GIF89a\x01\x00\x01\x00".to_vec();
        let res = Resource::from_part("media/image9.bin", gif);
        assert_eq!(res.mime_type, "image/gif");
        assert_eq!(res.extension(), "gif");
    }

    #[test]
    fn test_unknown_defaults_to_png_extension() {
        let res = Resource::from_part("media/blob", vec![0u8; 16]);
        assert!(!res.is_image());
        assert_eq!(res.extension(), "png");
    }

    #[test]
    fn test_detect_mime_type() {
        let jpeg_data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(Resource::detect_mime_type(&jpeg_data), Some("image/jpeg"));

        let png_data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(Resource::detect_mime_type(&png_data), Some("image/png"));

        let unknown = vec![0x00, 0x00, 0x00, 0x00];
        assert_eq!(Resource::detect_mime_type(&unknown), None);
    }
}
