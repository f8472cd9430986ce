//! Item code cleanup.

/// Strip quoting artifacts from an item code.
///
/// One leading apostrophe (a spreadsheet text marker) is removed first. Then,
/// on what remains, a leading double quote is removed together with a
/// matching trailing one if present.
pub fn normalize_code(code: &str) -> String {
    let code = code.strip_prefix('\'').unwrap_or(code);

    match code.strip_prefix('"') {
        Some(rest) => rest.strip_suffix('"').unwrap_or(rest).to_string(),
        None => code.to_string(),
    }
}
