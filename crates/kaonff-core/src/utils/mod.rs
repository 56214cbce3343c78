use crate::Float;

/// Useful enumerations for the kaon final states and fit modes.
pub mod enums;
/// Adaptive Gauss-Legendre quadrature on bounded intervals.
pub mod quadrature;
/// Histogram comparisons and efficiency estimates.
pub mod statistics;

/// A helper method to get histogram edges from evenly-spaced `bins` over a given `range`
/// # See Also
/// [`Histogram`]
/// [`get_bin_index`]
pub fn get_bin_edges(bins: usize, range: (Float, Float)) -> Vec<Float> {
    let bin_width = (range.1 - range.0) / (bins as Float);
    (0..=bins)
        .map(|i| range.0 + (i as Float * bin_width))
        .collect()
}

/// A helper method to obtain the index of a bin where a value should go in a histogram with evenly
/// spaced `bins` over a given `range`. The upper edge is included in the last bin.
///
/// # See Also
/// [`Histogram`]
/// [`get_bin_edges`]
pub fn get_bin_index(value: Float, bins: usize, limits: (Float, Float)) -> Option<usize> {
    if value >= limits.0 && value <= limits.1 {
        let bin_width = (limits.1 - limits.0) / bins as Float;
        let bin_index = ((value - limits.0) / bin_width).floor() as usize;
        Some(bin_index.min(bins - 1))
    } else {
        None
    }
}

/// A simple struct which represents a histogram
#[derive(Clone, Debug)]
pub struct Histogram {
    /// The number of counts in each bin (can be `Float`s since these might be weighted counts)
    pub counts: Vec<Float>,
    /// The edges of each bin (length is one greater than `counts`)
    pub bin_edges: Vec<Float>,
}

impl Histogram {
    /// The centers of each bin.
    pub fn bin_centers(&self) -> Vec<Float> {
        self.bin_edges
            .windows(2)
            .map(|edges| (edges[0] + edges[1]) / 2.0)
            .collect()
    }
}

/// A method which creates a histogram from some data by binning it with evenly spaced `bins` within
/// the given `range`
pub fn histogram(
    values: &[Float],
    bins: usize,
    range: (Float, Float),
    weights: Option<&[Float]>,
) -> Histogram {
    assert!(bins > 0, "Number of bins must be greater than zero!");
    assert!(
        range.1 > range.0,
        "The lower edge of the range must be smaller than the upper edge!"
    );
    if let Some(w) = weights {
        assert_eq!(
            values.len(),
            w.len(),
            "`values` and `weights` must have the same length!"
        );
    }
    let mut counts = vec![0.0; bins];
    for (i, &value) in values.iter().enumerate() {
        if let Some(bin_index) = get_bin_index(value, bins, range) {
            let weight = weights.map_or(1.0, |w| w[i]);
            counts[bin_index] += weight;
        }
    }
    Histogram {
        counts,
        bin_edges: get_bin_edges(bins, range),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_binning() {
        let edges = get_bin_edges(4, (0.0, 2.0));
        assert_eq!(edges, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(get_bin_index(0.25, 4, (0.0, 2.0)), Some(0));
        assert_eq!(get_bin_index(2.0, 4, (0.0, 2.0)), Some(3));
        assert_eq!(get_bin_index(-0.1, 4, (0.0, 2.0)), None);
    }

    #[test]
    fn test_weighted_histogram() {
        let values = [0.1, 0.6, 0.7, 1.9, 3.0];
        let weights = [1.0, 2.0, 0.5, 1.0, 10.0];
        let h = histogram(&values, 2, (0.0, 2.0), Some(&weights));
        assert_relative_eq!(h.counts[0], 3.5);
        assert_relative_eq!(h.counts[1], 1.0);
        assert_eq!(h.bin_centers(), vec![0.5, 1.5]);
    }
}
