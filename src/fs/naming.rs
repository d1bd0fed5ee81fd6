//! Filename generation and manipulation.

use crate::config::FilenameStyle;
use crate::error::{Error, Result};
use crate::media::ResolvedMedia;

/// Maximum length of the title part of a filename.
pub const MAX_TITLE_LEN: usize = 50;

/// Validate a filename, rejecting path traversal and replacing characters
/// that are invalid on common filesystems.
pub fn sanitize_filename(name: &str) -> Result<String> {
    // Reject path traversal attempts
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidFilename(format!(
            "Path separators not allowed in filename: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed in filename: '{}'",
            name
        )));
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Reject empty or whitespace-only names
    if sanitized.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Filename cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Reduce a post title to `[A-Za-z0-9_-]`, at most [`MAX_TITLE_LEN`] characters.
pub fn sanitize_title(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_TITLE_LEN)
        .collect()
}

/// Build the filename for a resolved asset.
///
/// - basic: `<post_id><suffix>.<ext>`
/// - pretty: `<title><suffix>.<ext>`
/// - advanced: `<YYYY-MM-DD_HH-MM-SS>_<post_id>_<title><suffix>.<ext>`
pub fn format_filename(style: FilenameStyle, media: &ResolvedMedia) -> Result<String> {
    let suffix = media.index_suffix();
    let title = match sanitize_title(&media.title) {
        t if t.is_empty() => media.post_id.clone(),
        t => t,
    };

    let stem = match style {
        FilenameStyle::Basic => format!("{}{}", media.post_id, suffix),
        FilenameStyle::Pretty => format!("{}{}", title, suffix),
        FilenameStyle::Advanced => format!(
            "{}_{}_{}{}",
            media.created_at.format("%Y-%m-%d_%H-%M-%S"),
            media.post_id,
            title,
            suffix
        ),
    };

    sanitize_filename(&format!("{}.{}", stem, media.file_extension))
}

/// Insert `_<n>` before the extension: `cat.jpg` -> `cat_2.jpg`.
pub fn numbered_filename(filename: &str, n: u32) -> String {
    match filename.rfind('.') {
        Some(dot_pos) if dot_pos > 0 => {
            format!("{}_{}{}", &filename[..dot_pos], n, &filename[dot_pos..])
        }
        _ => format!("{}_{}", filename, n),
    }
}
