//! Lower median of channel samples.

/// Returns the lower median of `values`, reordering the slice.
///
/// For an even number of values the smaller of the two middle values is
/// returned, so the result is always one of the inputs.
pub fn lower_median(values: &mut [u8]) -> Option<u8> {
    if values.is_empty() {
        return None;
    }
    let mid = (values.len() - 1) / 2;
    let (_, median, _) = values.select_nth_unstable(mid);
    Some(*median)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd() {
        assert_eq!(lower_median(&mut [30, 10, 20]), Some(20));
    }

    #[test]
    fn test_median_even_takes_lower() {
        assert_eq!(lower_median(&mut [20, 10]), Some(10));
        assert_eq!(lower_median(&mut [4, 1, 3, 2]), Some(2));
    }

    #[test]
    fn test_median_single() {
        assert_eq!(lower_median(&mut [42]), Some(42));
    }

    #[test]
    fn test_median_empty() {
        assert_eq!(lower_median(&mut []), None);
    }

    #[test]
    fn test_median_ignores_outlier() {
        assert_eq!(lower_median(&mut [12, 255, 11, 13, 12]), Some(12));
    }
}
