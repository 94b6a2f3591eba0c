//! Content types for uploaded assets, keyed on the remote path's extension.

/// Content type constants for the asset types a site typically serves.
pub mod types {
    pub const CSS: &str = "text/css";
    pub const JAVASCRIPT: &str = "application/javascript";
    pub const JSON: &str = "application/json";
    pub const HTML: &str = "text/html";
    pub const PLAIN: &str = "text/plain";
    pub const XML: &str = "application/xml";
    pub const MANIFEST: &str = "application/manifest+json";
    pub const SOURCE_MAP: &str = "application/json";

    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const AVIF: &str = "image/avif";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/vnd.microsoft.icon";
    pub const BMP: &str = "image/bmp";

    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const OTF: &str = "font/otf";
    pub const EOT: &str = "application/vnd.ms-fontobject";

    pub const MP4: &str = "video/mp4";
    pub const WEBM: &str = "video/webm";
    pub const MP3: &str = "audio/mpeg";
    pub const PDF: &str = "application/pdf";
    pub const SWF: &str = "application/x-shockwave-flash";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Content type for a remote key. Extensions compare case-insensitively.
pub fn from_key(key: &str) -> &'static str {
    let name = key.rsplit('/').next().unwrap_or(key);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => from_extension(&ext.to_ascii_lowercase()),
        _ => types::OCTET_STREAM,
    }
}

fn from_extension(ext: &str) -> &'static str {
    match ext {
        "css" => types::CSS,
        "js" | "mjs" => types::JAVASCRIPT,
        "json" => types::JSON,
        "map" => types::SOURCE_MAP,
        "webmanifest" => types::MANIFEST,
        "html" | "htm" => types::HTML,
        "txt" => types::PLAIN,
        "xml" => types::XML,

        "png" => types::PNG,
        "jpg" | "jpeg" => types::JPEG,
        "gif" => types::GIF,
        "webp" => types::WEBP,
        "avif" => types::AVIF,
        "svg" => types::SVG,
        "ico" => types::ICO,
        "bmp" => types::BMP,

        "woff" => types::WOFF,
        "woff2" => types::WOFF2,
        "ttf" => types::TTF,
        "otf" => types::OTF,
        "eot" => types::EOT,

        "mp4" => types::MP4,
        "webm" => types::WEBM,
        "mp3" => types::MP3,
        "pdf" => types::PDF,
        "swf" => types::SWF,
        _ => types::OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("assets/app.css", types::CSS)]
    #[case("v1/assets/app.js", types::JAVASCRIPT)]
    #[case("images/logo.PNG", types::PNG)]
    #[case("images/photo.jpeg", types::JPEG)]
    #[case("fonts/icons.woff2", types::WOFF2)]
    #[case("assets/app.7.css", types::CSS)]
    #[case("robots.txt", types::PLAIN)]
    #[case("LICENSE", types::OCTET_STREAM)]
    #[case("images/.hidden", types::OCTET_STREAM)]
    #[case("data.unknown", types::OCTET_STREAM)]
    fn test_from_key(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(from_key(key), expected);
    }
}
