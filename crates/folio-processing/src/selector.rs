use folio_core::{DerivativeDescriptor, Encoding};

/// Pick the best derivative for a width cap and an encoding preference.
///
/// The target width is the largest candidate width not exceeding `max_width`,
/// or the smallest width overall when every candidate is wider. Among
/// candidates at the target width the preferred encoding wins; otherwise the
/// lowest encoding extension in lexicographic order, then the lowest path.
pub fn select_best(
    candidates: &[DerivativeDescriptor],
    max_width: u32,
    prefer: Encoding,
) -> Option<&DerivativeDescriptor> {
    let target = candidates
        .iter()
        .map(|c| c.width)
        .filter(|w| *w <= max_width)
        .max()
        .or_else(|| candidates.iter().map(|c| c.width).min())?;

    candidates
        .iter()
        .filter(|c| c.width == target)
        .min_by(|a, b| rank(a, prefer).cmp(&rank(b, prefer)))
}

fn rank(c: &DerivativeDescriptor, prefer: Encoding) -> (bool, &'static str, &str) {
    (c.encoding != prefer, c.encoding.extension(), c.rel.as_str())
}
