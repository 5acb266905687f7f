use crate::error::{AppError, Result};
use crate::models::StationRecord;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Read the flattened station file into memory.
///
/// The file must be a JSON array of objects. A missing file or a document that
/// does not have that shape fails the whole load; individual field problems are
/// left for the normalizer. A key repeated inside one object keeps its last value.
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<StationRecord>> {
    let path = path.as_ref();
    debug!("Reading station records from {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::SourceNotFound(path.to_path_buf())
        } else {
            AppError::Io(e)
        }
    })?;

    let records = parse_records(&content).map_err(|e| match e {
        AppError::Parse(msg) => AppError::Parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })?;

    info!("Loaded {} station records from {}", records.len(), path.display());
    Ok(records)
}

pub fn parse_records(content: &str) -> Result<Vec<StationRecord>> {
    // Going through `Value` lets repeated keys overwrite instead of failing the derive
    let entries = serde_json::from_str::<Vec<Value>>(content)
        .map_err(|e| AppError::Parse(format!("Expected a JSON array of station records: {}", e)))?;

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::Object(_) => serde_json::from_value::<StationRecord>(entry)
                .map_err(|e| AppError::Parse(format!("Station record {}: {}", index, e))),
            other => Err(AppError::Parse(format!(
                "Station record {} is not an object: {}",
                index, other
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records() {
        let content = r#"[
            {"ID": 1, "Latitude": 38.7, "Longitude": -9.1},
            {"ID": "2", "Latitude": "bad", "Número de Pontos": "x"}
        ]"#;

        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_records("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_array() {
        let result = parse_records(r#"{"ID": 1}"#);
        assert!(matches!(result, Err(AppError::Parse(_))));
    }

    #[test]
    fn test_parse_rejects_non_object_entries() {
        let result = parse_records("[1, 2, 3]");
        assert!(matches!(result, Err(AppError::Parse(_))));

        let result = parse_records(r#"[{"ID": 1}, null]"#);
        match result {
            Err(AppError::Parse(msg)) => assert!(msg.contains("record 1")),
            other => panic!("Expected Parse error, got: {:?}", other),
        }
    }

    #[test]
    fn test_repeated_key_keeps_last_value() {
        let content = r#"[
            {"ID": 1, "Cidade": "Lisboa", "Latitude": 38.7, "Longitude": -9.1},
            {"ID": 2, "Cidade": "Braga", "Cidade": "Porto", "Latitude": 41.1, "Longitude": -8.6}
        ]"#;

        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].city, Some(Value::from("Porto")));
    }
}
