//! Upload helpers

use folio_core::AppError;

/// Reduce a client-supplied filename to its final path component.
///
/// Browsers on Windows may send full paths, so both separators are honoured.
pub fn sanitize_filename(raw: &str) -> Result<String, AppError> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(AppError::InvalidInput(format!(
            "Invalid upload filename: {:?}",
            raw
        )));
    }
    Ok(name.to_string())
}
