//! Dataset provider
//!
//! Resolves a feature matrix and label vector from a CSV file when one exists,
//! otherwise from the bundled digits dataset.

pub mod digits;

use crate::error::{PipelineError, Result};
use ndarray::{s, Array1, Array2};
use polars::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where a dataset came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// Parsed from a CSV file
    Csv(PathBuf),
    /// The bundled UCI digits, see [`digits::load_digits`]
    BuiltinDigits,
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::Csv(path) => write!(f, "{}", path.display()),
            DatasetSource::BuiltinDigits => f.write_str("builtin:digits"),
        }
    }
}

/// Feature matrix plus one integer class label per row
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Array2<f64>,
    pub labels: Array1<usize>,
    pub feature_names: Vec<String>,
    pub source: DatasetSource,
}

impl Dataset {
    /// Build a dataset, checking that every row has a label
    pub fn new(
        features: Array2<f64>,
        labels: Array1<usize>,
        feature_names: Vec<String>,
        source: DatasetSource,
    ) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{} labels", features.nrows()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if feature_names.len() != features.ncols() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{} feature names", features.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        Ok(Self { features, labels, feature_names, source })
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Number of distinct labels
    pub fn n_classes(&self) -> usize {
        let mut labels = self.labels.to_vec();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }

    /// Keep only the first `n` rows
    pub fn truncate(mut self, n: usize) -> Self {
        let n = n.min(self.n_samples());
        self.features = self.features.slice(s![..n, ..]).to_owned();
        self.labels = self.labels.slice(s![..n]).to_owned();
        self
    }

    /// Convert to a DataFrame with the label column last
    pub fn to_dataframe(&self, target_column: &str) -> Result<DataFrame> {
        let mut columns: Vec<Column> = self
            .feature_names
            .iter()
            .enumerate()
            .map(|(j, name)| Series::new(name.as_str().into(), self.features.column(j).to_vec()).into())
            .collect();

        let targets: Vec<i64> = self.labels.iter().map(|&l| l as i64).collect();
        columns.push(Series::new(target_column.into(), targets).into());

        Ok(DataFrame::new(columns)?)
    }

    /// Write the dataset as CSV, creating parent directories as needed
    pub fn write_csv(&self, path: impl AsRef<Path>, target_column: &str) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut df = self.to_dataframe(target_column)?;
        let mut file = std::fs::File::create(path)?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;

        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "Dataset written"
        );
        Ok(())
    }
}

/// Fallback used when no CSV file is present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Digits,
}

/// Resolves the training dataset
#[derive(Debug, Clone)]
pub struct DatasetProvider {
    path: PathBuf,
    target_column: String,
    fallback: Option<Fallback>,
}

impl DatasetProvider {
    /// Provider reading `path`, falling back to the bundled digits
    pub fn new(path: impl Into<PathBuf>, target_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target_column: target_column.into(),
            fallback: Some(Fallback::Digits),
        }
    }

    /// Disable the fallback so a missing file is an error
    pub fn without_fallback(mut self) -> Self {
        self.fallback = None;
        self
    }

    /// Load the dataset; re-reads the file or re-parses the bundled rows on every call
    pub fn load(&self) -> Result<Dataset> {
        if self.path.is_file() {
            let ds = load_csv(&self.path, &self.target_column)?;
            info!(
                path = %self.path.display(),
                samples = ds.n_samples(),
                features = ds.n_features(),
                "Loaded dataset from CSV"
            );
            return Ok(ds);
        }

        match self.fallback {
            Some(Fallback::Digits) => {
                let ds = digits::load_digits()?;
                info!(
                    missing_path = %self.path.display(),
                    samples = ds.n_samples(),
                    features = ds.n_features(),
                    "CSV not found, using bundled digits dataset"
                );
                Ok(ds)
            }
            None => Err(PipelineError::NoExternalData),
        }
    }
}

/// Read a CSV file into a dataset
pub fn load_csv(path: &Path, target_column: &str) -> Result<Dataset> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    dataframe_to_dataset(&df, target_column, DatasetSource::Csv(path.to_path_buf()))
}

/// Split a DataFrame into features and labels.
///
/// The label column is `target_column` when present, otherwise the last column.
/// All remaining columns, in file order, become features.
pub fn dataframe_to_dataset(df: &DataFrame, target_column: &str, source: DatasetSource) -> Result<Dataset> {
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    if names.len() < 2 {
        return Err(PipelineError::Data(format!(
            "need at least one feature column and one label column, found {} columns",
            names.len()
        )));
    }
    if df.height() == 0 {
        return Err(PipelineError::Data("dataset has no rows".to_string()));
    }

    let label_name = if names.iter().any(|n| n == target_column) {
        target_column.to_string()
    } else {
        names[names.len() - 1].clone()
    };
    let feature_names: Vec<String> = names.into_iter().filter(|n| *n != label_name).collect();

    let mut features = Array2::<f64>::zeros((df.height(), feature_names.len()));
    for (j, name) in feature_names.iter().enumerate() {
        let values = numeric_column(df, name)?;
        for (i, v) in values.into_iter().enumerate() {
            features[[i, j]] = v;
        }
    }

    let labels = numeric_column(df, &label_name)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(PipelineError::Data(format!(
                    "label column '{}' row {} is not a non-negative integer: {}",
                    label_name, row, v
                )))
            }
        })
        .collect::<Result<Vec<usize>>>()?;

    Dataset::new(features, Array1::from_vec(labels), feature_names, source)
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;

    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                PipelineError::Data(format!("column '{}' row {} is missing or not numeric", name, row))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_named_target_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "data.csv", "a,target,b\n1,0,2\n3,1,4\n5,2,6\n");

        let ds = DatasetProvider::new(&path, "target").load().unwrap();
        assert_eq!(ds.feature_names, vec!["a", "b"]);
        assert_eq!(ds.features.row(1).to_vec(), vec![3.0, 4.0]);
        assert_eq!(ds.labels.to_vec(), vec![0, 1, 2]);
        assert_eq!(ds.source, DatasetSource::Csv(path));
    }

    #[test]
    fn test_last_column_is_label_without_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "data.csv", "x,y,class\n0.5,1.5,1\n2.5,3.5,0\n");

        let ds = DatasetProvider::new(&path, "target").load().unwrap();
        assert_eq!(ds.feature_names, vec!["x", "y"]);
        assert_eq!(ds.labels.to_vec(), vec![1, 0]);
        assert_eq!(ds.n_features(), 2);
    }

    #[test]
    fn test_fallback_to_digits() {
        let dir = tempfile::tempdir().unwrap();
        let ds = DatasetProvider::new(dir.path().join("missing.csv"), "target").load().unwrap();
        assert_eq!(ds.source, DatasetSource::BuiltinDigits);
        assert_eq!(ds.source.to_string(), "builtin:digits");
        assert_eq!(ds.n_features(), 64);
    }

    #[test]
    fn test_no_fallback_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = DatasetProvider::new(dir.path().join("missing.csv"), "target")
            .without_fallback()
            .load()
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoExternalData));
    }

    #[test]
    fn test_fractional_label_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "data.csv", "a,target\n1,0.5\n");
        let err = load_csv(&path, "target").unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }

    #[test]
    fn test_csv_written_by_dataset_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("raw_dataset.csv");

        let original = digits::load_digits().unwrap().truncate(25);
        original.write_csv(&path, "target").unwrap();

        let loaded = DatasetProvider::new(&path, "target").load().unwrap();
        assert_eq!(loaded.n_samples(), 25);
        assert_eq!(loaded.feature_names, original.feature_names);
        assert_eq!(loaded.features, original.features);
        assert_eq!(loaded.labels, original.labels);
    }

    #[test]
    fn test_truncate() {
        let ds = digits::load_digits().unwrap().truncate(500);
        assert_eq!(ds.n_samples(), 500);
        assert_eq!(ds.labels.len(), 500);
        assert_eq!(ds.n_classes(), 10);
    }
}
