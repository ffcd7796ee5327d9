#[derive(Clone, Debug, PartialEq)]
pub enum EncodingOptions {
    Png,
    Jpeg(JpegSettings),
    WebP(WebpSettings),
    Avif(AvifSettings),
    Tiff,
    Bmp,
    Gif,
    Ico,
}

impl EncodingOptions {
    /// Every output format with its default encoder settings, in menu order.
    pub fn all() -> Vec<EncodingOptions> {
        vec![
            EncodingOptions::Png,
            EncodingOptions::Jpeg(JpegSettings::default()),
            EncodingOptions::WebP(WebpSettings::default()),
            EncodingOptions::Avif(AvifSettings::default()),
            EncodingOptions::Tiff,
            EncodingOptions::Bmp,
            EncodingOptions::Gif,
            EncodingOptions::Ico,
        ]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            EncodingOptions::Png => "png",
            EncodingOptions::Jpeg(_) => "jpg",
            EncodingOptions::WebP(_) => "webp",
            EncodingOptions::Avif(_) => "avif",
            EncodingOptions::Tiff => "tiff",
            EncodingOptions::Bmp => "bmp",
            EncodingOptions::Gif => "gif",
            EncodingOptions::Ico => "ico",
        }
    }

    /// Formats without an alpha channel get composited onto white first.
    pub fn supports_alpha(&self) -> bool {
        !matches!(
            self,
            EncodingOptions::Jpeg(_) | EncodingOptions::Tiff | EncodingOptions::Bmp
        )
    }

    pub fn same_format(&self, other: &EncodingOptions) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl Default for EncodingOptions {
    fn default() -> Self {
        EncodingOptions::Png
    }
}

impl std::fmt::Display for EncodingOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodingOptions::Png => write!(f, "PNG"),
            EncodingOptions::Jpeg(_) => write!(f, "JPEG"),
            EncodingOptions::WebP(_) => write!(f, "WebP"),
            EncodingOptions::Avif(_) => write!(f, "AVIF"),
            EncodingOptions::Tiff => write!(f, "TIFF"),
            EncodingOptions::Bmp => write!(f, "BMP"),
            EncodingOptions::Gif => write!(f, "GIF"),
            EncodingOptions::Ico => write!(f, "ICO"),
        }
    }
}

// Avif settings
#[derive(Clone, Debug, PartialEq)]
pub struct AvifSettings {
    pub quality: u8,
    pub speed: u8,
}

impl Default for AvifSettings {
    fn default() -> Self {
        Self {
            quality: 75,
            speed: 8,
        }
    }
}

// Webp settings
#[derive(Clone, Debug, PartialEq)]
pub struct WebpSettings {
    pub quality: u8,
    pub lossless: bool,
}

impl Default for WebpSettings {
    fn default() -> Self {
        Self {
            quality: 95,
            lossless: false,
        }
    }
}

// Jpeg settings
#[derive(Clone, Debug, PartialEq)]
pub struct JpegSettings {
    pub quality: u8,
}

impl Default for JpegSettings {
    fn default() -> Self {
        Self { quality: 95 }
    }
}
