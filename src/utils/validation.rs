use anyhow::{bail, Result};

pub const MAX_SCAN_NAME_CHARS: usize = 100;

/// Scan names must be non-blank and at most 100 characters.
pub fn validate_scan_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Name cannot be empty");
    }
    if name.chars().count() > MAX_SCAN_NAME_CHARS {
        bail!("Name is too long (max {MAX_SCAN_NAME_CHARS} characters)");
    }
    Ok(())
}

pub fn is_valid_confidence(confidence: f64) -> bool {
    (0.0..=1.0).contains(&confidence)
}

/// Lowercase ASCII alphanumerics, everything else collapsed into single
/// underscores, no leading or trailing underscore.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}
