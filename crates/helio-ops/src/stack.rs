//! Image stacking.
//!
//! Batch reducers over same-shaped mono frames: plain and weighted
//! averaging for building master frames, median stacking for outlier
//! rejection (satellite trails, cosmic hits). All inputs must share one
//! shape; the first frame's metadata bag is carried into the result with a
//! history entry appended.

use helio_core::{Error, Image, MonoImage};
use rayon::prelude::*;

use crate::error::{OpsError, OpsResult};

/// Averages a batch of mono frames.
pub fn average(frames: &[MonoImage]) -> OpsResult<MonoImage> {
    let weights = vec![1.0f32; frames.len()];
    weighted_average(frames, &weights)
}

/// Weighted average of a batch of mono frames.
///
/// # Errors
///
/// Rejects an empty batch, a weight-count mismatch, a non-positive weight
/// sum and any shape mismatch among the frames.
pub fn weighted_average(frames: &[MonoImage], weights: &[f32]) -> OpsResult<MonoImage> {
    let (w, h) = check_batch(frames)?;
    if weights.len() != frames.len() {
        return Err(OpsError::InvalidParameter(format!(
            "{} weights for {} frames",
            weights.len(),
            frames.len()
        )));
    }
    let total: f64 = weights.iter().map(|&v| f64::from(v)).sum();
    if total <= 0.0 {
        return Err(OpsError::InvalidParameter(format!(
            "weight sum must be positive, got {total}"
        )));
    }

    let mut data = vec![0.0f32; w * h];
    data.par_iter_mut().enumerate().for_each(|(i, out)| {
        let mut acc = 0.0f64;
        for (frame, &weight) in frames.iter().zip(weights) {
            acc += f64::from(frame.data()[i]) * f64::from(weight);
        }
        *out = (acc / total) as f32;
    });

    result_image(frames, w, h, data, "Weighted average")
}

/// Per-pixel median of a batch of mono frames.
pub fn median_stack(frames: &[MonoImage]) -> OpsResult<MonoImage> {
    let (w, h) = check_batch(frames)?;

    let mut data = vec![0.0f32; w * h];
    data.par_iter_mut().enumerate().for_each(|(i, out)| {
        let mut column: Vec<f32> = frames.iter().map(|f| f.data()[i]).collect();
        column.sort_by(f32::total_cmp);
        let n = column.len();
        *out = if n % 2 == 1 {
            column[n / 2]
        } else {
            (column[n / 2 - 1] + column[n / 2]) / 2.0
        };
    });

    result_image(frames, w, h, data, "Median stack")
}

fn check_batch(frames: &[MonoImage]) -> OpsResult<(usize, usize)> {
    let first = frames
        .first()
        .ok_or_else(|| OpsError::InvalidParameter("empty frame batch".to_string()))?;
    let expected = first.dimensions();
    for frame in &frames[1..] {
        if frame.dimensions() != expected {
            return Err(OpsError::Core(Error::shape_mismatch(
                expected,
                frame.dimensions(),
            )));
        }
    }
    Ok(expected)
}

fn result_image(
    frames: &[MonoImage],
    w: usize,
    h: usize,
    data: Vec<f32>,
    history: &str,
) -> OpsResult<MonoImage> {
    let mut metadata = frames[0].metadata().clone();
    metadata.append_transform(format!("{history} ({} frames)", frames.len()));
    MonoImage::from_data(w, h, data, metadata).map_err(OpsError::Core)
}

/// Convenience: shape check over heterogeneous images, re-exported for
/// batch pipelines.
pub fn check_same_shape<'a>(
    images: impl IntoIterator<Item = &'a Image>,
) -> OpsResult<(usize, usize)> {
    helio_core::check_same_shape(images).map_err(OpsError::Core)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(fill: f32) -> MonoImage {
        let mut img = MonoImage::new(4, 3);
        for v in img.data_mut() {
            *v = fill;
        }
        img
    }

    #[test]
    fn test_average() {
        let out = average(&[frame(100.0), frame(300.0)]).unwrap();
        assert!(out.data().iter().all(|&v| (v - 200.0).abs() < 1e-3));
    }

    #[test]
    fn test_weighted_average() {
        let out = weighted_average(&[frame(100.0), frame(400.0)], &[3.0, 1.0]).unwrap();
        // (3*100 + 1*400) / 4 = 175.
        assert!(out.data().iter().all(|&v| (v - 175.0).abs() < 1e-3));
    }

    #[test]
    fn test_median_rejects_outlier() {
        let out = median_stack(&[frame(100.0), frame(102.0), frame(60000.0)]).unwrap();
        assert!(out.data().iter().all(|&v| (v - 102.0).abs() < 1e-3));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let odd = MonoImage::new(5, 3);
        assert!(average(&[frame(1.0), odd]).is_err());
    }

    #[test]
    fn test_bad_weights_rejected() {
        assert!(weighted_average(&[frame(1.0)], &[]).is_err());
        assert!(weighted_average(&[frame(1.0), frame(2.0)], &[0.0, 0.0]).is_err());
        assert!(average(&[]).is_err());
    }

    #[test]
    fn test_history_appended() {
        let out = average(&[frame(1.0), frame(2.0)]).unwrap();
        assert_eq!(
            out.metadata().transformation_history().unwrap(),
            &["Weighted average (2 frames)"]
        );
    }
}
