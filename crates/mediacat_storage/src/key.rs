//! Storage key helpers.

/// Sanitize a human-supplied file name into a backend-safe key segment.
///
/// Every character outside `[A-Za-z0-9._-]` becomes `_`, so the resulting
/// segment is safe as a path component and as an object name.
///
/// # Examples
///
/// ```
/// use mediacat_storage::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("holiday photo (1).png"), "holiday_photo__1_.png");
/// assert_eq!(sanitize_file_name(""), "file");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    if name.is_empty() {
        return "file".to_string();
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_passes_safe_names() {
        assert_eq!(sanitize_file_name("cover-01_final.webp"), "cover-01_final.webp");
    }

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_file_name("a/b\\c d.png"), "a_b_c_d.png");
        assert_eq!(sanitize_file_name("Ünïcode.png"), "_n_code.png");
    }
}
