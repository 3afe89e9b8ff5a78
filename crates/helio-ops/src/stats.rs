//! Image statistics and histograms.
//!
//! Whole-image and ellipse-masked variants share one accumulator; the
//! histogram covers the nominal `[0, 65535]` domain with a configurable
//! bin count and exposes cumulative counts for percentile queries. The
//! [`background`] estimate feeds the quarter-turn rotations, which fill
//! uncovered pixels with it.

use helio_core::{Ellipse, MonoImage, PIXEL_MAX};

/// Summary statistics of a sample set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImageStats {
    /// Smallest sample.
    pub min: f32,
    /// Largest sample.
    pub max: f32,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median (middle-pair average for even counts).
    pub median: f32,
    /// Population standard deviation.
    pub stddev: f64,
    /// Median absolute deviation.
    pub mad: f32,
    /// Number of samples.
    pub count: usize,
}

/// Computes statistics over a full sample plane.
pub fn compute_stats(data: &[f32]) -> ImageStats {
    stats_of(data.iter().copied())
}

/// Computes statistics over the samples inside `ellipse`.
pub fn masked_stats(data: &[f32], width: usize, ellipse: &Ellipse) -> ImageStats {
    let height = if width == 0 { 0 } else { data.len() / width };
    let samples = (0..height).flat_map(|y| {
        (0..width).filter_map(move |x| {
            if ellipse.contains(x as f64, y as f64) {
                Some(data[y * width + x])
            } else {
                None
            }
        })
    });
    stats_of(samples)
}

fn stats_of(samples: impl Iterator<Item = f32>) -> ImageStats {
    let mut values: Vec<f32> = samples.collect();
    if values.is_empty() {
        return ImageStats::default();
    }
    values.sort_by(f32::total_cmp);
    let count = values.len();
    let min = values[0];
    let max = values[count - 1];
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / count as f64;
    let variance = values
        .iter()
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum::<f64>()
        / count as f64;
    let median = sorted_mid(&values);

    let mut deviations: Vec<f32> = values.iter().map(|&v| (v - median).abs()).collect();
    deviations.sort_by(f32::total_cmp);
    let mad = sorted_mid(&deviations);

    ImageStats {
        min,
        max,
        mean,
        median,
        stddev: variance.sqrt(),
        mad,
        count,
    }
}

fn sorted_mid(sorted: &[f32]) -> f32 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// A histogram over the nominal `[0, 65535]` domain.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: Vec<u32>,
    bin_width: f32,
}

impl Histogram {
    /// Borrows the bin counts.
    pub fn bins(&self) -> &[u32] {
        &self.bins
    }

    /// Number of bins.
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Lower edge of bin `i`.
    pub fn bin_edge(&self, i: usize) -> f32 {
        i as f32 * self.bin_width
    }

    /// Running cumulative counts, one per bin.
    pub fn cumulative(&self) -> Vec<u64> {
        let mut total = 0u64;
        self.bins
            .iter()
            .map(|&c| {
                total += u64::from(c);
                total
            })
            .collect()
    }

    /// Value below which fraction `p` of the samples fall.
    ///
    /// Resolved at bin granularity; `p` is clamped to `[0, 1]`.
    pub fn percentile(&self, p: f64) -> f32 {
        let cumulative = self.cumulative();
        let total = *cumulative.last().unwrap_or(&0);
        if total == 0 {
            return 0.0;
        }
        let target = (p.clamp(0.0, 1.0) * total as f64).ceil() as u64;
        for (i, &c) in cumulative.iter().enumerate() {
            if c >= target {
                return self.bin_edge(i + 1);
            }
        }
        PIXEL_MAX
    }
}

/// Builds a histogram of `data` with `bin_count` bins over `[0, 65535]`.
///
/// Samples outside the domain are clamped into the edge bins.
pub fn histogram(data: &[f32], bin_count: usize) -> Histogram {
    let bin_count = bin_count.max(1);
    let bin_width = (PIXEL_MAX + 1.0) / bin_count as f32;
    let mut bins = vec![0u32; bin_count];
    for &v in data {
        let idx = ((v / bin_width) as isize).clamp(0, bin_count as isize - 1) as usize;
        bins[idx] += 1;
    }
    Histogram { bins, bin_width }
}

/// Histogram-based background estimate.
///
/// The mean of the samples at or below the 10th-percentile cutoff of a
/// 256-bin histogram; falls back to the minimum for degenerate inputs.
pub fn background(image: &MonoImage) -> f32 {
    let data = image.data();
    if data.is_empty() {
        return 0.0;
    }
    let cutoff = histogram(data, 256).percentile(0.1);
    let mut sum = 0.0f64;
    let mut n = 0usize;
    for &v in data {
        if v <= cutoff {
            sum += f64::from(v);
            n += 1;
        }
    }
    if n == 0 {
        compute_stats(data).min
    } else {
        (sum / n as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_basic_stats() {
        let s = compute_stats(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert_abs_diff_eq!(s.mean, 3.0);
        assert_eq!(s.median, 3.0);
        assert_eq!(s.mad, 1.0);
        assert_eq!(s.count, 5);
        assert_abs_diff_eq!(s.stddev, 2.0f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_even_median() {
        let s = compute_stats(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.median, 2.5);
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(compute_stats(&[]), ImageStats::default());
    }

    #[test]
    fn test_masked_stats() {
        // 10x10 plane: 500 inside a centered disk, 0 outside.
        let mut data = vec![0.0f32; 100];
        let disk = Ellipse::circle(5.0, 5.0, 2.5);
        for y in 0..10 {
            for x in 0..10 {
                if disk.contains(x as f64, y as f64) {
                    data[y * 10 + x] = 500.0;
                }
            }
        }
        let s = masked_stats(&data, 10, &disk);
        assert_eq!(s.min, 500.0);
        assert_eq!(s.max, 500.0);
        assert!(s.count > 10 && s.count < 40);
    }

    #[test]
    fn test_histogram_and_percentile() {
        // 90 samples at 0, 10 at the top of the range.
        let mut data = vec![0.0f32; 90];
        data.extend(std::iter::repeat_n(60000.0f32, 10));
        let h = histogram(&data, 256);
        assert_eq!(h.bins().iter().sum::<u32>(), 100);
        assert_eq!(*h.cumulative().last().unwrap(), 100);
        // The 50th percentile sits in the zero bin.
        assert!(h.percentile(0.5) < 1000.0);
        assert!(h.percentile(0.99) > 59000.0);
    }

    #[test]
    fn test_background_estimate() {
        // Mostly dark sky at ~100 with a bright disk.
        let mut img = MonoImage::new(32, 32);
        for (i, v) in img.data_mut().iter_mut().enumerate() {
            *v = if i % 7 == 0 { 40000.0 } else { 100.0 };
        }
        let bg = background(&img);
        assert!(bg < 200.0, "background was {bg}");
    }
}
