//! Pure dimension math, testable without any I/O.

/// Scale `source` down so it fits inside `bounds`, keeping aspect ratio.
///
/// Width is checked first. Height is only checked when the width already
/// fits, so a source that is too wide *and* too tall is scaled on width alone
/// and may still come out taller than `bounds`. Nothing is ever scaled up.
///
/// ```
/// # use upload_resizer::image::calculate_fit_dimensions;
/// assert_eq!(calculate_fit_dimensions((2000, 1000), (800, 800)), (800, 400));
/// assert_eq!(calculate_fit_dimensions((400, 300), (800, 800)), (400, 300));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;
    let aspect = src_w as f64 / src_h as f64;

    if src_w > max_w {
        (max_w, scaled(max_w as f64 / aspect))
    } else if src_h > max_h {
        (scaled(max_h as f64 * aspect), max_h)
    } else {
        source
    }
}

fn scaled(value: f64) -> u32 {
    (value.round() as u32).max(1)
}
