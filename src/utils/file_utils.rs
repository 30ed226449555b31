use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const DEFAULT_EXTENSION: &str = "bin";

/// Extension for a stored object: the file name's own extension, else one
/// registered for the content type, else `bin`. Always lowercase, no dot.
pub fn resolve_extension(file_name: &str, content_type: &str) -> String {
    get_extension(file_name)
        .or_else(|| extension_for_content_type(content_type))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

pub fn get_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|x| x.to_str())
        .filter(|x| !x.is_empty() && x.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|x| x.to_ascii_lowercase())
}

fn extension_for_content_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    // mime_guess lists extensions alphabetically, which gives `jfif` for jpeg
    let preferred = match essence.as_str() {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/webm" => Some("webm"),
        _ => None,
    };
    if let Some(extension) = preferred {
        return Some(extension.to_string());
    }
    mime_guess::get_mime_extensions_str(&essence)
        .and_then(|x| x.first())
        .map(|x| x.to_string())
}

/// Declared content type, or one guessed from the file name when the client
/// sent nothing useful.
pub fn content_type_or_guess(file_name: &str, declared: Option<&str>) -> String {
    match declared.map(str::trim).filter(|x| !x.is_empty() && *x != DEFAULT_CONTENT_TYPE) {
        Some(content_type) => content_type.to_string(),
        None => mime_guess::from_path(file_name)
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_prefers_file_name() {
        assert_eq!(resolve_extension("Logo.PNG", "image/jpeg"), "png");
        assert_eq!(resolve_extension("archive.tar.gz", "application/gzip"), "gz");
    }

    #[test]
    fn extension_falls_back_to_content_type() {
        assert_eq!(resolve_extension("blob", "image/png"), "png");
        assert_eq!(resolve_extension("blob.", "image/png; charset=binary"), "png");
    }

    #[test]
    fn common_types_get_their_usual_extension() {
        assert_eq!(resolve_extension("blob", "image/jpeg"), "jpg");
        assert_eq!(resolve_extension("IMG_0001", "Image/JPEG"), "jpg");
        assert_eq!(resolve_extension("clip", "video/quicktime"), "mov");
        assert_eq!(resolve_extension("clip", "video/mp4"), "mp4");
    }

    #[test]
    fn extension_defaults_to_bin() {
        assert_eq!(resolve_extension("blob", "application/x-unknown-thing"), "bin");
        assert_eq!(resolve_extension("", ""), "bin");
    }

    #[test]
    fn content_type_guessed_when_missing() {
        assert_eq!(content_type_or_guess("clip.mp4", None), "video/mp4");
        assert_eq!(content_type_or_guess("clip.mp4", Some("application/octet-stream")), "video/mp4");
        assert_eq!(content_type_or_guess("clip.mp4", Some("video/quicktime")), "video/quicktime");
        assert_eq!(content_type_or_guess("noext", Some("")), DEFAULT_CONTENT_TYPE);
    }
}
