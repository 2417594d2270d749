//! Dataset loading and preparation
//!
//! Reads the UCI heart disease CSV, normalizes its schema, and produces the
//! cleaned frame the rest of the pipeline works with. The raw export uses
//! `?` for missing values and sometimes names the target `num`; both are
//! handled here so downstream code only ever sees the canonical columns.

use std::path::{Path, PathBuf};

use ndarray::Array1;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::Settings;
use crate::error::{HeartError, Result};

/// Feature columns in canonical order
pub const FEATURE_COLUMNS: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Continuous features (median impute + standard scale)
pub const NUMERIC_COLUMNS: [&str; 5] = ["age", "trestbps", "chol", "thalach", "oldpeak"];

/// Discrete-coded features (most-frequent impute + one-hot encode)
pub const CATEGORICAL_COLUMNS: [&str; 8] =
    ["sex", "cp", "fbs", "restecg", "exang", "slope", "ca", "thal"];

pub const TARGET_COLUMN: &str = "target";

/// Read a CSV with `?` registered as a missing-value marker.
fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(HeartError::DataNotFound(path.to_path_buf()));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .with_parse_options(
            CsvParseOptions::default()
                .with_null_values(Some(NullValues::AllColumnsSingle("?".into()))),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    Ok(df)
}

/// Normalize column names: lower-case, trim, and rename `num` to `target`.
fn normalize_columns(df: &DataFrame) -> Result<DataFrame> {
    let new_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| {
            let n = name.trim().to_lowercase();
            if n == "num" {
                TARGET_COLUMN.to_string()
            } else {
                n
            }
        })
        .collect();

    let mut renamed = df.clone();
    renamed.set_column_names(new_names)?;
    Ok(renamed)
}

/// Clean a raw frame into the canonical dataset.
///
/// Coerces every required column to Float64 (unparseable values become
/// nulls), drops rows with any missing required value, and binarizes the
/// target with `target = (raw > 0)`.
pub fn clean(df: &DataFrame) -> Result<DataFrame> {
    let df = normalize_columns(df)?;

    let missing: Vec<String> = FEATURE_COLUMNS
        .iter()
        .chain(std::iter::once(&TARGET_COLUMN))
        .filter(|c| df.column(c).is_err())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(HeartError::MissingColumns(missing));
    }

    // Coerce to numeric; non-numeric leftovers turn into nulls here.
    let mut coerced = df.select(FEATURE_COLUMNS.iter().copied().chain([TARGET_COLUMN]))?;
    for col_name in FEATURE_COLUMNS.iter().chain(std::iter::once(&TARGET_COLUMN)) {
        let cast = coerced.column(col_name)?.cast(&DataType::Float64)?;
        coerced.with_column(cast)?;
    }

    // Drop rows with any missing required value.
    let mut mask: Option<BooleanChunked> = None;
    for col_name in FEATURE_COLUMNS.iter().chain(std::iter::once(&TARGET_COLUMN)) {
        let not_null = coerced
            .column(col_name)?
            .as_materialized_series()
            .is_not_null();
        mask = Some(match mask {
            Some(m) => &m & &not_null,
            None => not_null,
        });
    }
    let complete = match mask {
        Some(m) => coerced.filter(&m)?,
        None => coerced,
    };

    // Binarize: raw target counts vessels 0-4; anything above 0 is disease.
    let raw_target = complete.column(TARGET_COLUMN)?.as_materialized_series();
    let binarized: Vec<i32> = raw_target
        .f64()?
        .into_iter()
        .map(|v| if v.unwrap_or(0.0) > 0.0 { 1 } else { 0 })
        .collect();

    let mut cleaned = complete.clone();
    cleaned.with_column(Series::new(TARGET_COLUMN.into(), binarized))?;

    Ok(cleaned)
}

/// Load and clean a CSV at an arbitrary path.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    let df = read_csv(path)?;
    let cleaned = clean(&df)?;
    info!(
        path = %path.display(),
        rows = cleaned.height(),
        dropped = df.height() - cleaned.height(),
        "loaded dataset"
    );
    Ok(cleaned)
}

/// Load the raw dataset from the configured raw-data directory.
pub fn load_raw(settings: &Settings, path: Option<&Path>) -> Result<DataFrame> {
    let default = settings.raw_data_path();
    load_csv(path.unwrap_or(&default))
}

/// Load the cleaned dataset from the processed-data directory.
pub fn load_processed(settings: &Settings) -> Result<DataFrame> {
    load_csv(&settings.processed_data_path())
}

/// Load the committed sample dataset used for quick runs and tests.
pub fn load_sample(settings: &Settings) -> Result<DataFrame> {
    load_csv(&settings.sample_data_path)
}

/// Split a cleaned frame into the feature frame and the target vector.
pub fn split_features_target(df: &DataFrame) -> Result<(DataFrame, Array1<f64>)> {
    let x = df.select(FEATURE_COLUMNS.iter().copied())?;
    let target = df.column(TARGET_COLUMN)?.cast(&DataType::Float64)?;
    let y: Array1<f64> = target
        .as_materialized_series()
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();
    Ok((x, y))
}

/// Select rows of a frame by positional indices.
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx: IdxCa = IdxCa::from_vec("idx".into(), indices.iter().map(|&i| i as IdxSize).collect());
    Ok(df.take(&idx)?)
}

/// Stratified train/test split of a cleaned frame.
///
/// Every class contributes a proportional share to the test split, so both
/// sides carry the same set of distinct labels and train + test == input.
pub fn train_test_split(
    df: &DataFrame,
    test_size: f64,
    seed: u64,
) -> Result<(DataFrame, DataFrame)> {
    if !(0.0..1.0).contains(&test_size) || test_size <= 0.0 {
        return Err(HeartError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let target = df.column(TARGET_COLUMN)?.cast(&DataType::Float64)?;
    let labels: Vec<i64> = target
        .as_materialized_series()
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(0.0).round() as i64)
        .collect();

    let mut class_indices: std::collections::BTreeMap<i64, Vec<usize>> = Default::default();
    for (idx, &label) in labels.iter().enumerate() {
        class_indices.entry(label).or_default().push(idx);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_idx = Vec::with_capacity(df.height());
    let mut test_idx = Vec::new();

    for indices in class_indices.values_mut() {
        indices.shuffle(&mut rng);
        let n = indices.len();
        // Keep at least one sample of each class on both sides when possible.
        let n_test = if n >= 2 {
            ((n as f64 * test_size).round() as usize).clamp(1, n - 1)
        } else {
            0
        };
        test_idx.extend_from_slice(&indices[..n_test]);
        train_idx.extend_from_slice(&indices[n_test..]);
    }

    train_idx.sort_unstable();
    test_idx.sort_unstable();

    Ok((take_rows(df, &train_idx)?, take_rows(df, &test_idx)?))
}

/// Prepare the processed dataset: clean the raw CSV and write it (plus a
/// small provenance stub) under the processed-data directory.
pub fn prepare(settings: &Settings) -> Result<PathBuf> {
    std::fs::create_dir_all(&settings.raw_data_dir)?;
    std::fs::create_dir_all(&settings.processed_data_dir)?;

    let raw_path = settings.raw_data_path();
    let source = if raw_path.exists() {
        raw_path
    } else {
        // Fall back to the committed sample so a fresh checkout can bootstrap.
        settings.sample_data_path.clone()
    };

    let mut cleaned = load_csv(&source)?;
    let out_path = settings.processed_data_path();
    let mut file = std::fs::File::create(&out_path)?;
    CsvWriter::new(&mut file).finish(&mut cleaned)?;

    let stub = serde_json::json!({
        "source": source.display().to_string(),
        "rows": cleaned.height(),
        "prepared_at": chrono::Utc::now().to_rfc3339(),
    });
    std::fs::write(
        settings.processed_data_dir.join("metadata.json"),
        serde_json::to_string_pretty(&stub)?,
    )?;

    info!(path = %out_path.display(), rows = cleaned.height(), "wrote processed dataset");
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_df() -> DataFrame {
        df!(
            "Age " => &["63", "41", "57", "?", "52"],
            "sex" => &["1", "0", "1", "1", "0"],
            "cp" => &["3", "1", "0", "2", "1"],
            "trestbps" => &["145", "130", "120", "140", "118"],
            "chol" => &["233", "204", "354", "241", "210"],
            "fbs" => &["1", "0", "0", "0", "0"],
            "restecg" => &["0", "0", "1", "1", "1"],
            "thalach" => &["150", "172", "163", "123", "160"],
            "exang" => &["0", "0", "1", "1", "0"],
            "oldpeak" => &["2.3", "1.4", "0.6", "0.2", "0.0"],
            "slope" => &["0", "2", "2", "1", "2"],
            "ca" => &["0", "0", "0", "?", "0"],
            "thal" => &["1", "2", "2", "3", "2"],
            "num" => &["1", "0", "0", "3", "0"]
        )
        .unwrap()
    }

    #[test]
    fn test_clean_drops_missing_and_binarizes() {
        let cleaned = clean(&raw_df()).unwrap();
        // The row with "?" in age and ca is dropped.
        assert_eq!(cleaned.height(), 4);
        let target: Vec<i32> = cleaned
            .column(TARGET_COLUMN)
            .unwrap()
            .as_materialized_series()
            .i32()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(target, vec![1, 0, 0, 0]);
        for col in FEATURE_COLUMNS {
            assert_eq!(cleaned.column(col).unwrap().null_count(), 0);
        }
    }

    #[test]
    fn test_clean_missing_columns() {
        let df = df!("age" => &[63.0], "sex" => &[1.0]).unwrap();
        let err = clean(&df).unwrap_err();
        match err {
            HeartError::MissingColumns(cols) => assert!(cols.contains(&"thal".to_string())),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_missing_file_is_data_not_found() {
        let err = load_csv(Path::new("data/raw/nonexistent.csv")).unwrap_err();
        assert!(matches!(err, HeartError::DataNotFound(_)));
    }

    #[test]
    fn test_split_features_target_shapes() {
        let cleaned = clean(&raw_df()).unwrap();
        let (x, y) = split_features_target(&cleaned).unwrap();
        assert_eq!(x.width(), FEATURE_COLUMNS.len());
        assert_eq!(y.len(), cleaned.height());
    }
}
