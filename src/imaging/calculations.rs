//! Pure calculation functions for derivative dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Height of a derivative resized to `width`, preserving the source aspect
/// ratio. Never returns zero.
///
/// # Examples
/// ```
/// # use simple_srcset::imaging::scaled_height;
/// // 1920x1080 source at 480px wide → 270px tall
/// assert_eq!(scaled_height((1920, 1080), 480), 270);
/// ```
pub fn scaled_height(source: (u32, u32), width: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return src_h.max(1);
    }
    let h = (src_h as f64 * width as f64 / src_w as f64).round() as u32;
    h.max(1)
}

/// Decide which widths to generate for a source `source_width` pixels wide.
///
/// Requested widths larger than the source are dropped (derivatives are never
/// upscaled). If none of the remaining widths reaches the source width, the
/// source width itself is appended so the largest derivative is full size.
/// The result is ascending and free of duplicates.
///
/// # Examples
/// ```
/// # use simple_srcset::imaging::calculate_derivative_widths;
/// let defaults = [480, 1024, 1920, 2560];
/// assert_eq!(calculate_derivative_widths(1920, &defaults), vec![480, 1024, 1920]);
/// assert_eq!(calculate_derivative_widths(4160, &defaults), vec![480, 1024, 1920, 2560, 4160]);
/// assert_eq!(calculate_derivative_widths(150, &defaults), vec![150]);
/// ```
pub fn calculate_derivative_widths(source_width: u32, requested: &[u32]) -> Vec<u32> {
    let mut widths = capped_widths(source_width, requested);
    if !widths.iter().any(|&w| w >= source_width) && source_width > 0 {
        widths.push(source_width);
    }
    widths
}

/// Requested widths that fit the source, ascending and deduplicated, without
/// the full-size fallback. Falls back to the source width only when nothing
/// fits.
///
/// ```
/// # use simple_srcset::imaging::capped_widths;
/// assert_eq!(capped_widths(300, &[64]), vec![64]);
/// assert_eq!(capped_widths(40, &[64]), vec![40]);
/// ```
pub fn capped_widths(source_width: u32, requested: &[u32]) -> Vec<u32> {
    let mut widths: Vec<u32> = requested
        .iter()
        .copied()
        .filter(|&w| w > 0 && w <= source_width)
        .collect();
    widths.sort_unstable();
    widths.dedup();
    if widths.is_empty() && source_width > 0 {
        widths.push(source_width);
    }
    widths
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: [u32; 4] = [480, 1024, 1920, 2560];

    // =========================================================================
    // scaled_height tests
    // =========================================================================

    #[test]
    fn scaled_height_landscape() {
        assert_eq!(scaled_height((2000, 1500), 1000), 750);
    }

    #[test]
    fn scaled_height_portrait() {
        assert_eq!(scaled_height((1500, 2000), 750), 1000);
    }

    #[test]
    fn scaled_height_rounds() {
        // 300x200 at 64 → 42.67 → 43
        assert_eq!(scaled_height((300, 200), 64), 43);
    }

    #[test]
    fn scaled_height_never_zero() {
        assert_eq!(scaled_height((4000, 10), 10), 1);
    }

    // =========================================================================
    // calculate_derivative_widths tests
    // =========================================================================

    #[test]
    fn widths_source_matches_a_default() {
        assert_eq!(
            calculate_derivative_widths(1920, &DEFAULTS),
            vec![480, 1024, 1920]
        );
    }

    #[test]
    fn widths_source_larger_than_all_defaults() {
        assert_eq!(
            calculate_derivative_widths(4160, &DEFAULTS),
            vec![480, 1024, 1920, 2560, 4160]
        );
    }

    #[test]
    fn widths_source_smaller_than_all_defaults() {
        assert_eq!(calculate_derivative_widths(150, &DEFAULTS), vec![150]);
    }

    #[test]
    fn widths_source_between_defaults_gets_full_size() {
        assert_eq!(
            calculate_derivative_widths(2000, &DEFAULTS),
            vec![480, 1024, 1920, 2000]
        );
    }

    #[test]
    fn widths_are_sorted_and_deduplicated() {
        assert_eq!(
            calculate_derivative_widths(3000, &[1024, 480, 1024, 3000]),
            vec![480, 1024, 3000]
        );
    }

    #[test]
    fn widths_ignore_zero() {
        assert_eq!(calculate_derivative_widths(800, &[0, 400]), vec![400, 800]);
    }

    #[test]
    fn capped_widths_skip_full_size_fallback() {
        assert_eq!(capped_widths(4000, &[64, 32, 64]), vec![32, 64]);
        assert_eq!(capped_widths(20, &[64]), vec![20]);
    }

    #[test]
    fn widths_empty_request_returns_source() {
        assert_eq!(calculate_derivative_widths(1000, &[]), vec![1000]);
    }
}
