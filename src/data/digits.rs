//! Bundled handwritten-digit dataset
//!
//! The UCI "Optical Recognition of Handwritten Digits" test set: 1797 samples
//! of 8x8 images, 10 classes, pixel intensities 0..=16. The rows are compiled
//! into the binary as CSV (`pixel_0..pixel_63,target`) and parsed on demand.

use super::{dataframe_to_dataset, Dataset, DatasetSource};
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::io::Cursor;

/// Number of samples in the bundled dataset
pub const N_SAMPLES: usize = 1797;

/// Number of pixel features per sample
pub const N_FEATURES: usize = 64;

/// Number of digit classes
pub const N_CLASSES: usize = 10;

const DIGITS_CSV: &str = include_str!("digits.csv");

/// Parse the bundled digits dataset
pub fn load_digits() -> Result<Dataset> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(DIGITS_CSV.as_bytes()))
        .finish()?;

    let ds = dataframe_to_dataset(&df, "target", DatasetSource::BuiltinDigits)?;
    if ds.n_samples() != N_SAMPLES || ds.n_features() != N_FEATURES {
        return Err(PipelineError::ShapeMismatch {
            expected: format!("{}x{}", N_SAMPLES, N_FEATURES),
            actual: format!("{}x{}", ds.n_samples(), ds.n_features()),
        });
    }
    Ok(ds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_classes() {
        let ds = load_digits().unwrap();
        assert_eq!(ds.n_samples(), N_SAMPLES);
        assert_eq!(ds.n_features(), N_FEATURES);
        assert_eq!(ds.n_classes(), N_CLASSES);
        assert_eq!(ds.feature_names[0], "pixel_0");
        assert_eq!(ds.feature_names[63], "pixel_63");
        assert_eq!(ds.source, DatasetSource::BuiltinDigits);
    }

    #[test]
    fn test_first_rows_match_uci_digits() {
        let ds = load_digits().unwrap();
        let first: Vec<f64> = vec![
            0., 0., 5., 13., 9., 1., 0., 0., 0., 0., 13., 15., 10., 15., 5., 0., 0., 3., 15., 2., 0., 11.,
            8., 0., 0., 4., 12., 0., 0., 8., 8., 0., 0., 5., 8., 0., 0., 9., 8., 0., 0., 4., 11., 0., 1.,
            12., 7., 0., 0., 2., 14., 5., 10., 12., 0., 0., 0., 0., 6., 13., 10., 0., 0., 0.,
        ];
        assert_eq!(ds.features.row(0).to_vec(), first);
        assert_eq!(ds.labels.slice(ndarray::s![..12]).to_vec(), vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 1]);
        assert_eq!(ds.labels[N_SAMPLES - 1], 8);
    }

    #[test]
    fn test_class_counts() {
        let ds = load_digits().unwrap();
        let mut counts = [0usize; N_CLASSES];
        for &label in ds.labels.iter() {
            counts[label] += 1;
        }
        assert_eq!(counts, [178, 182, 177, 183, 181, 182, 181, 179, 174, 180]);
    }

    #[test]
    fn test_intensity_range() {
        let ds = load_digits().unwrap();
        assert!(ds.features.iter().all(|&v| (0.0..=16.0).contains(&v) && v.fract() == 0.0));
        assert!(ds.features.iter().any(|&v| v == 16.0));
    }
}
