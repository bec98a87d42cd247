use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::Path;

/// Inline a screenshot file as a `data:` URL.
///
/// Returns `None` for an empty path or a file that cannot be read, so the
/// report still renders when screenshots were moved or pruned.
pub fn embed_screenshot(path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    let path = Path::new(path);
    let bytes = std::fs::read(path).ok()?;
    Some(format!(
        "data:{};base64,{}",
        mime_type(path),
        STANDARD.encode(bytes)
    ))
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "image/png",
    }
}
