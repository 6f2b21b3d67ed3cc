/// Fallback name for uploads without a usable filename
pub const DEFAULT_FILENAME: &str = "image.jpg";

const MAX_STEM_LEN: usize = 100;

/// Sanitize an uploaded filename for use in a storage key.
///
/// Keeps the last path component, replaces every character outside `[A-Za-z0-9_.-]`
/// with `_` and forces a `.jpg` extension, since every variant is re-encoded as JPEG.
pub fn sanitize_filename(original: Option<&str>) -> String {
    let Some(original) = original else {
        return DEFAULT_FILENAME.to_string();
    };

    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();
    let stem = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    };

    let sanitized: String = stem
        .chars()
        .take(MAX_STEM_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches('.');

    if sanitized.is_empty() || sanitized.contains("..") {
        DEFAULT_FILENAME.to_string()
    } else {
        format!("{}.jpg", sanitized)
    }
}
