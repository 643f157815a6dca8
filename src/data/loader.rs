use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{
    AGE, COUNT, CellValue, EMBARKED, FARE, PARCH, PCLASS, Passenger, PassengerDataset,
    REQUIRED_COLUMNS, SIBSP, SURVIVED,
};
use crate::error::{ExplorerError, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load and clean a passenger table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one passenger per line (the Kaggle layout)
/// * `.json`    – `[{ "Survived": 1, "Pclass": 3, ... }, ...]`
/// * `.parquet` – flat columns, as written by `df.to_parquet()`
///
/// Every failure is reported as [`ExplorerError::DataUnavailable`].
pub fn load_file(path: &Path) -> Result<PassengerDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let raw = match ext.as_str() {
        "csv" => std::fs::File::open(path)
            .context("opening CSV")
            .and_then(read_csv),
        "json" => read_json(path),
        "parquet" | "pq" => read_parquet(path),
        other => Err(anyhow::anyhow!("unsupported file extension: .{other}")),
    };

    raw.and_then(clean)
        .map_err(|e| unavailable(path, &e))
        .inspect(|ds| {
            log::info!(
                "Loaded {} passengers from {} ({} rows dropped)",
                ds.len(),
                path.display(),
                ds.dropped_rows
            );
        })
}

/// Parse and clean CSV text from any reader.
pub fn parse_csv<R: Read>(reader: R) -> Result<PassengerDataset> {
    read_csv(reader)
        .and_then(clean)
        .map_err(|e| ExplorerError::DataUnavailable(format!("{e:#}")))
}

fn unavailable(path: &Path, e: &anyhow::Error) -> ExplorerError {
    log::error!("Failed to load {}: {e:#}", path.display());
    ExplorerError::DataUnavailable(format!("{}: {e:#}", path.display()))
}

// ---------------------------------------------------------------------------
// Raw table: rows exactly as read, before cleaning
// ---------------------------------------------------------------------------

struct RawTable {
    columns: Vec<String>,
    rows: Vec<BTreeMap<String, CellValue>>,
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv<R: Read>(reader: R) -> anyhow::Result<RawTable> {
    let mut reader = csv::Reader::from_reader(reader);
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row = columns
            .iter()
            .zip(record.iter())
            .map(|(col, value)| (col.clone(), CellValue::parse(value)))
            .collect();
        rows.push(row);
    }

    Ok(RawTable { columns, rows })
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`:
///
/// ```json
/// [
///   { "Survived": 0, "Pclass": 3, "Sex": "male", "Age": 22.0, ... },
///   ...
/// ]
/// ```
fn read_json(path: &Path) -> anyhow::Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("row {i} is not a JSON object"))?;

        let mut row = BTreeMap::new();
        for (key, val) in obj {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
            row.insert(key.clone(), json_to_cell(val));
        }
        rows.push(row);
    }

    Ok(RawTable { columns, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Flat Parquet table, one column per field.  Works with files written by
/// both **Pandas** (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn read_parquet(path: &Path) -> anyhow::Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = columns
                .iter()
                .zip(batch.columns())
                .map(|(name, col)| (name.clone(), extract_cell(col, row)))
                .collect();
            rows.push(cells);
        }
    }

    Ok(RawTable { columns, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 => CellValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => float_cell(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => float_cell(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        other => match array_value_to_string(col, row) {
            Ok(text) => CellValue::String(text),
            Err(e) => {
                log::warn!("Unreadable {other:?} cell in row {row}: {e}");
                CellValue::Null
            }
        },
    }
}

/// Pandas writes missing floats as NaN rather than null.
fn float_cell(v: f64) -> CellValue {
    if v.is_nan() {
        CellValue::Null
    } else {
        CellValue::Float(v)
    }
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

/// Re-label coded columns, normalize numeric ones, drop rows missing
/// fare/age/port and append the `count` column.
fn clean(raw: RawTable) -> anyhow::Result<PassengerDataset> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !raw.columns.iter().any(|h| h == c))
        .collect();
    if !missing.is_empty() {
        bail!("missing required columns: {}", missing.join(", "));
    }

    let mut column_names = raw.columns;
    column_names.retain(|c| c != COUNT);
    column_names.push(COUNT.to_string());

    let total = raw.rows.len();
    let passengers: Vec<Passenger> = raw
        .rows
        .into_iter()
        .filter_map(|mut cells| {
            relabel(&mut cells);
            normalize(&mut cells);
            let incomplete = [FARE, AGE, EMBARKED]
                .iter()
                .any(|c| cells.get(*c).map_or(true, CellValue::is_null));
            if incomplete {
                return None;
            }
            cells.insert(COUNT.to_string(), CellValue::Integer(1));
            Some(Passenger { cells })
        })
        .collect();

    let dropped = total - passengers.len();
    log::debug!("Cleaning kept {} of {total} rows", passengers.len());
    Ok(PassengerDataset::new(passengers, column_names, dropped))
}

fn relabel(cells: &mut BTreeMap<String, CellValue>) {
    if let Some(v) = cells.get_mut(SURVIVED) {
        if let Some(label) = code(v).and_then(survival_label) {
            *v = CellValue::from(label);
        }
    }
    if let Some(v) = cells.get_mut(PCLASS) {
        if let Some(label) = code(v).and_then(class_label) {
            *v = CellValue::from(label);
        }
    }
    if let Some(v) = cells.get_mut(EMBARKED) {
        if let CellValue::String(s) = v {
            if let Some(label) = port_label(s) {
                *v = CellValue::from(label);
            }
        }
    }
}

/// Integral code of a numeric or boolean cell.
fn code(v: &CellValue) -> Option<i64> {
    match v {
        CellValue::Integer(i) => Some(*i),
        CellValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        CellValue::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn survival_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("Yes"),
        0 => Some("No"),
        _ => None,
    }
}

fn class_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("1st"),
        2 => Some("2nd"),
        3 => Some("3rd"),
        _ => None,
    }
}

fn port_label(code: &str) -> Option<&'static str> {
    match code {
        "C" => Some("Cherbourg"),
        "Q" => Some("Queenstown"),
        "S" => Some("Southampton"),
        _ => None,
    }
}

/// Age and fare are continuous; sibling and parent counts are whole numbers.
/// Anything else in these columns is unreadable and becomes null.
fn normalize(cells: &mut BTreeMap<String, CellValue>) {
    for col in [AGE, FARE] {
        if let Some(v) = cells.get_mut(col) {
            *v = match v.as_f64() {
                Some(f) => CellValue::Float(f),
                None => CellValue::Null,
            };
        }
    }
    for col in [SIBSP, PARCH] {
        if let Some(v) = cells.get_mut(col) {
            *v = match v {
                CellValue::Integer(i) => CellValue::Integer(*i),
                CellValue::Float(f) if f.fract() == 0.0 => CellValue::Integer(*f as i64),
                CellValue::Float(f) => CellValue::Float(*f),
                _ => CellValue::Null,
            };
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) const SAMPLE_CSV: &str = "\
PassengerId,Survived,Pclass,Name,Sex,Age,SibSp,Parch,Ticket,Fare,Cabin,Embarked
1,0,3,\"Braund, Mr. Owen Harris\",male,22,1,0,A/5 21171,7.25,,S
2,1,1,\"Cumings, Mrs. John Bradley\",female,38,1,0,PC 17599,71.2833,C85,C
3,1,3,\"Heikkinen, Miss. Laina\",female,26,0,0,STON/O2. 3101282,7.925,,S
6,0,3,\"Moran, Mr. James\",male,,0,0,330877,8.4583,,Q
17,0,3,\"Rice, Master. Eugene\",male,2,4,1,382652,29.125,,Q
62,1,1,\"Icard, Miss. Amelie\",female,38,0,0,113572,80,B28,
10,1,2,\"Nasser, Mrs. Nicholas\",female,14,1,0,237736,30.0708,,C
";

    #[test]
    fn relabels_and_drops_incomplete_rows() {
        let ds = parse_csv(SAMPLE_CSV.as_bytes()).unwrap();
        // Moran has no age, Icard no port.
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.dropped_rows, 2);

        for p in &ds.passengers {
            assert!(!p.value(FARE).is_null());
            assert!(!p.value(AGE).is_null());
            assert!(!p.value(EMBARKED).is_null());
            assert!(matches!(p.value(SURVIVED), CellValue::String(s) if s == "Yes" || s == "No"));
            assert!(
                matches!(p.value(PCLASS), CellValue::String(s) if ["1st", "2nd", "3rd"].contains(&s.as_str()))
            );
            assert!(matches!(
                p.value(EMBARKED),
                CellValue::String(s) if ["Cherbourg", "Queenstown", "Southampton"].contains(&s.as_str())
            ));
            assert_eq!(p.value(COUNT), &CellValue::Integer(1));
        }
    }

    #[test]
    fn keeps_passthrough_columns_and_order() {
        let ds = parse_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(ds.column_names.first().map(String::as_str), Some("PassengerId"));
        assert_eq!(ds.column_names.last().map(String::as_str), Some(COUNT));
        assert_eq!(
            ds.passengers[1].value("Name"),
            &CellValue::from("Cumings, Mrs. John Bradley")
        );
        assert_eq!(ds.passengers[1].value("Cabin"), &CellValue::from("C85"));
        assert!(ds.passengers[0].value("Cabin").is_null());
    }

    #[test]
    fn normalizes_numeric_columns() {
        let ds = parse_csv(SAMPLE_CSV.as_bytes()).unwrap();
        let first = &ds.passengers[0];
        assert_eq!(first.value(AGE), &CellValue::Float(22.0));
        assert_eq!(first.value(SIBSP), &CellValue::Integer(1));
        assert_eq!(first.value(FARE), &CellValue::Float(7.25));
    }

    #[test]
    fn unknown_codes_pass_through() {
        let csv = "Survived,Pclass,Sex,Age,SibSp,Parch,Fare,Embarked\n\
                   2,4,male,30,0,0,10,X\n";
        let ds = parse_csv(csv.as_bytes()).unwrap();
        let p = &ds.passengers[0];
        assert_eq!(p.value(SURVIVED), &CellValue::Integer(2));
        assert_eq!(p.value(PCLASS), &CellValue::Integer(4));
        assert_eq!(p.value(EMBARKED), &CellValue::from("X"));
    }

    #[test]
    fn missing_value_markers_drop_rows() {
        let csv = "Survived,Pclass,Sex,Age,SibSp,Parch,Fare,Embarked\n\
                   1,1,female,NA,0,0,10,S\n\
                   0,3,male,30,0,0,N/A,S\n\
                   1,2,female,40,0,0,12,NULL\n\
                   1,2,female,unknown,0,0,12,C\n\
                   0,3,male,25,null,0,8.05,Q\n";
        let ds = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.dropped_rows, 4);

        let p = &ds.passengers[0];
        assert_eq!(p.value(AGE), &CellValue::Float(25.0));
        assert!(p.value(SIBSP).is_null());
    }

    #[test]
    fn loads_parquet_columns() {
        use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let batch = RecordBatch::try_from_iter([
            ("Survived", Arc::new(Int64Array::from(vec![1, 0, 1, 0])) as ArrayRef),
            ("Pclass", Arc::new(Int64Array::from(vec![1, 3, 2, 3])) as ArrayRef),
            (
                "Sex",
                Arc::new(StringArray::from(vec!["female", "male", "female", "male"])) as ArrayRef,
            ),
            (
                "Age",
                Arc::new(Float64Array::from(vec![38.0, f64::NAN, 26.0, 22.0])) as ArrayRef,
            ),
            ("SibSp", Arc::new(Int64Array::from(vec![1, 0, 0, 1])) as ArrayRef),
            ("Parch", Arc::new(Int64Array::from(vec![0, 0, 0, 0])) as ArrayRef),
            (
                "Fare",
                Arc::new(Float64Array::from(vec![71.2833, 8.05, 13.0, 7.25])) as ArrayRef,
            ),
            (
                "Embarked",
                Arc::new(StringArray::from(vec![Some("C"), Some("S"), None, Some("S")]))
                    as ArrayRef,
            ),
        ])
        .unwrap();

        let mut file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(file.as_file_mut(), batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(file.path()).unwrap();
        // NaN age and missing port are dropped.
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.dropped_rows, 2);
        assert_eq!(ds.column_names.last().map(String::as_str), Some(COUNT));

        let first = &ds.passengers[0];
        assert_eq!(first.value(SURVIVED), &CellValue::from("Yes"));
        assert_eq!(first.value(PCLASS), &CellValue::from("1st"));
        assert_eq!(first.value(EMBARKED), &CellValue::from("Cherbourg"));
        assert_eq!(first.value(SIBSP), &CellValue::Integer(1));
        assert_eq!(first.value(AGE), &CellValue::Float(38.0));
        assert_eq!(first.value(COUNT), &CellValue::Integer(1));

        let second = &ds.passengers[1];
        assert_eq!(second.value(SURVIVED), &CellValue::from("No"));
        assert_eq!(second.value(PCLASS), &CellValue::from("3rd"));
        assert_eq!(second.value(EMBARKED), &CellValue::from("Southampton"));
    }

    #[test]
    fn missing_columns_are_data_unavailable() {
        let csv = "Survived,Pclass,Sex,Age\n1,1,male,22\n";
        let err = parse_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ExplorerError::DataUnavailable(ref m) if m.contains("Fare")));
    }

    #[test]
    fn unreadable_sources_are_data_unavailable() {
        let err = load_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, ExplorerError::DataUnavailable(_)));

        let err = load_file(Path::new("passengers.xlsx")).unwrap_err();
        assert!(matches!(err, ExplorerError::DataUnavailable(ref m) if m.contains("xlsx")));
    }

    #[test]
    fn loads_json_records() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[
                {{"Survived": 1, "Pclass": 2, "Sex": "female", "Age": 26.0, "SibSp": 0, "Parch": 0, "Fare": 13.0, "Embarked": "Q"}},
                {{"Survived": 0, "Pclass": 3, "Sex": "male", "Age": null, "SibSp": 0, "Parch": 0, "Fare": 8.05, "Embarked": "S"}}
            ]"#
        )
        .unwrap();

        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(
            &ds.column_names[..4],
            &["Survived", "Pclass", "Sex", "Age"].map(String::from)
        );
        assert_eq!(ds.passengers[0].value(PCLASS), &CellValue::from("2nd"));
        assert_eq!(ds.passengers[0].value(EMBARKED), &CellValue::from("Queenstown"));
    }

    #[test]
    fn loading_twice_is_deterministic() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(SAMPLE_CSV.as_bytes()).unwrap();

        let a = load_file(file.path()).unwrap();
        let b = load_file(file.path()).unwrap();
        assert_eq!(a.passengers, b.passengers);
        assert_eq!(a.column_names, b.column_names);
    }
}
