//! Exposure brackets and output naming for capture sequences.

use std::path::PathBuf;

use crate::image_pipeline::common::error::{ConversionError, Result};

/// `count` exposures evenly spaced from `start` to `stop`, both included.
pub fn exposure_bracket(start: f64, stop: f64, count: usize) -> Result<Vec<f64>> {
    if !start.is_finite() || !stop.is_finite() || start < 0.0 || stop < 0.0 {
        return Err(ConversionError::InvalidParameter(format!(
            "bracket bounds must be non-negative seconds, got {start}..{stop}"
        )));
    }
    Ok(match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    })
}

pub fn bracket_file_name(exposure: f64) -> String {
    format!("bracket_{exposure:05.2}s.fits")
}

/// Substitutes `index` for the first `{}` in `template`; a template without
/// one is used unchanged.
pub fn sequence_path(template: &str, index: usize) -> PathBuf {
    PathBuf::from(template.replacen("{}", &index.to_string(), 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_includes_both_ends() {
        let exposures = exposure_bracket(1.0, 31.0, 16).unwrap();
        assert_eq!(exposures.len(), 16);
        assert_eq!(exposures[0], 1.0);
        assert_eq!(exposures[1], 3.0);
        assert_eq!(exposures[15], 31.0);
    }

    #[test]
    fn degenerate_brackets() {
        assert!(exposure_bracket(1.0, 2.0, 0).unwrap().is_empty());
        assert_eq!(exposure_bracket(2.5, 9.0, 1).unwrap(), vec![2.5]);
        assert!(exposure_bracket(-1.0, 2.0, 3).is_err());
        assert!(exposure_bracket(1.0, f64::NAN, 3).is_err());
    }

    #[test]
    fn descending_brackets_are_allowed() {
        assert_eq!(exposure_bracket(4.0, 1.0, 4).unwrap(), vec![4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn file_names_are_zero_padded() {
        assert_eq!(bracket_file_name(1.0), "bracket_01.00s.fits");
        assert_eq!(bracket_file_name(31.0), "bracket_31.00s.fits");
        assert_eq!(bracket_file_name(0.3), "bracket_00.30s.fits");
    }

    #[test]
    fn sequence_paths() {
        assert_eq!(sequence_path("dark_{}.fits", 3), PathBuf::from("dark_3.fits"));
        assert_eq!(sequence_path("test.fits", 3), PathBuf::from("test.fits"));
    }
}
