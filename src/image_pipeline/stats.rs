//! Quick-look statistics of a single-channel frame.

use std::fmt;

use ndarray::ArrayView2;

use crate::image_pipeline::common::error::{ConversionError, Result};

pub const DEFAULT_QUANTILES: [f64; 4] = [0.25, 0.5, 0.75, 0.999];

#[derive(Debug, Clone, PartialEq)]
pub struct FrameStats {
    pub count: usize,
    pub min: u16,
    pub max: u16,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// `(q, value)` pairs, linearly interpolated between order statistics
    pub quantiles: Vec<(f64, f64)>,
}

impl FrameStats {
    pub fn compute(image: ArrayView2<u16>) -> Result<Self> {
        Self::with_quantiles(image, &DEFAULT_QUANTILES)
    }

    pub fn with_quantiles(image: ArrayView2<u16>, quantiles: &[f64]) -> Result<Self> {
        if image.is_empty() {
            let (height, width) = image.dim();
            return Err(ConversionError::InvalidDimensions(width, height));
        }
        if let Some(q) = quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return Err(ConversionError::InvalidParameter(format!(
                "quantile {q} outside [0, 1]"
            )));
        }

        // u16 samples fit a dense histogram, which gives every order
        // statistic without sorting
        let mut histogram = vec![0usize; u16::MAX as usize + 1];
        let mut sum = 0.0f64;
        for &v in image.iter() {
            histogram[v as usize] += 1;
            sum += v as f64;
        }

        let count = image.len();
        let mean = sum / count as f64;
        let variance = image
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / count as f64;

        let order_statistic = |k: usize| -> f64 {
            let mut seen = 0;
            for (value, &n) in histogram.iter().enumerate() {
                seen += n;
                if seen > k {
                    return value as f64;
                }
            }
            u16::MAX as f64
        };

        let quantiles = quantiles
            .iter()
            .map(|&q| {
                let position = q * (count - 1) as f64;
                let lower = position.floor() as usize;
                let upper = position.ceil() as usize;
                let low = order_statistic(lower);
                let value = if upper == lower {
                    low
                } else {
                    low + (order_statistic(upper) - low) * (position - lower as f64)
                };
                (q, value)
            })
            .collect();

        let min = histogram.iter().position(|&n| n > 0).unwrap_or(0) as u16;
        let max = histogram.iter().rposition(|&n| n > 0).unwrap_or(0) as u16;

        Ok(Self {
            count,
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
            quantiles,
        })
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Average: {:.2} ± {:.2}", self.mean, self.std_dev)?;
        writeln!(f, "Range: {} to {} over {} samples", self.min, self.max, self.count)?;
        writeln!(f, "Quantiles:")?;
        for (q, value) in &self.quantiles {
            writeln!(f, "  {:>6.1}%: {value}", q * 100.0)?;
        }
        Ok(())
    }
}
