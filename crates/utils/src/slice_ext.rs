use crate::error::{Error, Result};

/// Extends functionality for slices of bin boundaries
pub trait SliceExt {
    /// Check that every value is finite and larger than the one before it
    ///
    /// An empty slice or a single value is trivially increasing.
    ///
    /// ```rust
    /// # use ntally_utils::SliceExt;
    /// assert!([0.0, 0.1, 1.0].is_strictly_increasing());
    /// assert!(![0.0, 0.1, 0.1].is_strictly_increasing());
    /// assert!(![0.0, f64::NAN].is_strictly_increasing());
    /// ```
    fn is_strictly_increasing(&self) -> bool;

    /// Find index bin containing 'value', where bins are low < value <= high
    ///
    /// A value on a bin edge returns the bin below. Values equal to the lowest
    /// bound are considered part of the first bin.
    ///
    /// # Example
    /// ```text
    ///     boundaries: 0.0 0.1 1.0 20.0
    /// ```
    ///
    /// view of the resulting bins
    /// ```text
    ///     0.0 <= bin 0 <= 0.1
    ///     0.1 < bin 1 <= 1.0
    ///     1.0 < bin 2 <= 20.0
    /// ```
    ///
    /// ```rust
    /// # use ntally_utils::SliceExt;
    /// let bounds = vec![0.0, 0.1, 1.0, 20.0];
    ///
    /// // Find values in the array
    /// assert_eq!(bounds.find_bin_inclusive(0.0 ), Ok(0));
    /// assert_eq!(bounds.find_bin_inclusive(0.5 ), Ok(1));
    /// assert_eq!(bounds.find_bin_inclusive(1.0 ), Ok(1));
    /// assert_eq!(bounds.find_bin_inclusive(20.0), Ok(2));
    ///
    /// // Values outside the bin bounds are an error case
    /// assert!(bounds.find_bin_inclusive(-1.0).is_err());
    /// assert!(bounds.find_bin_inclusive(21.0).is_err());
    /// ```
    ///
    /// Boundaries are assumed sorted, and the search is a bisection so this is
    /// cheap enough to call for every scored event.
    fn find_bin_inclusive(&self, value: f64) -> Result<usize>;
}

impl SliceExt for [f64] {
    fn is_strictly_increasing(&self) -> bool {
        self.iter().all(|v| v.is_finite()) && self.windows(2).all(|w| w[0] < w[1])
    }

    fn find_bin_inclusive(&self, value: f64) -> Result<usize> {
        // make sure there are bin edges to check against
        let (Some(lower_bound), Some(upper_bound)) = (self.first(), self.last()) else {
            return Err(Error::BelowMinimumSliceLength {
                length: 0,
                minimum_required: 2,
            });
        };

        if self.len() < 2 {
            return Err(Error::BelowMinimumSliceLength {
                length: self.len(),
                minimum_required: 2,
            });
        }

        // is the value relevant? written this way round so NAN is rejected
        if !(value >= *lower_bound && value <= *upper_bound) {
            return Err(Error::ValueOutsideOfBounds {
                value,
                lower_bound: *lower_bound,
                upper_bound: *upper_bound,
            });
        }

        // special case for being on the lowest edge
        if value == *lower_bound {
            return Ok(0);
        }

        // first boundary >= value is the upper edge of the bin
        Ok(self.partition_point(|b| *b < value) - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0)]
    #[case(1e-3, 0)]
    #[case(0.1, 0)]
    #[case(0.10001, 1)]
    #[case(1.0, 1)]
    #[case(19.9, 2)]
    #[case(20.0, 2)]
    fn inclusive_bins(#[case] value: f64, #[case] expected: usize) {
        let bounds = [0.0, 0.1, 1.0, 20.0];
        assert_eq!(bounds.find_bin_inclusive(value), Ok(expected));
    }

    #[rstest]
    #[case(-0.1)]
    #[case(20.1)]
    #[case(f64::NAN)]
    fn inclusive_bins_outside(#[case] value: f64) {
        let bounds = [0.0, 0.1, 1.0, 20.0];
        assert!(matches!(
            bounds.find_bin_inclusive(value),
            Err(Error::ValueOutsideOfBounds { .. })
        ));
    }

    #[test]
    fn too_few_boundaries() {
        assert_eq!(
            [1.0].find_bin_inclusive(1.0),
            Err(Error::BelowMinimumSliceLength {
                length: 1,
                minimum_required: 2
            })
        );
        assert_eq!(
            Vec::<f64>::new().find_bin_inclusive(1.0),
            Err(Error::BelowMinimumSliceLength {
                length: 0,
                minimum_required: 2
            })
        );
    }

    #[test]
    fn increasing() {
        assert!([0.0, 1e3, 1e5, 1e7].is_strictly_increasing());
        assert!(![1.0, 0.0].is_strictly_increasing());
        assert!(![0.0, f64::INFINITY].is_strictly_increasing());
        assert!(Vec::<f64>::new().is_strictly_increasing());
    }
}
