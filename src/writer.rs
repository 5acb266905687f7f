use crate::error::{AppError, Result};
use crate::models::StationRecord;
use serde_json::Value;
use std::path::Path;
use tracing::info;

const CSV_HEADERS: [&str; 11] = [
    "ID",
    "Nome",
    "Operador",
    "Endereço",
    "Cidade",
    "Código Postal",
    "Latitude",
    "Longitude",
    "Número de Pontos",
    "Potência Total (kW)",
    "Data Atualização",
];

/// Write the records as a pretty-printed JSON array, creating parent directories.
pub fn save_json<P: AsRef<Path>>(path: P, records: &[StationRecord]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let content = serde_json::to_string_pretty(records)
        .map_err(|e| AppError::InvalidData(format!("Failed to serialize stations: {}", e)))?;
    std::fs::write(path, content)?;

    info!("Saved {} station records to {}", records.len(), path.display());
    Ok(())
}

/// Write the records as CSV with the same column names as the JSON keys.
pub fn save_csv<P: AsRef<Path>>(path: P, records: &[StationRecord]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer.write_record(CSV_HEADERS).map_err(csv_error)?;

    for record in records {
        let fields = [
            &record.id,
            &record.name,
            &record.operator,
            &record.address,
            &record.city,
            &record.postal_code,
            &record.latitude,
            &record.longitude,
            &record.number_of_points,
            &record.total_power_kw,
            &record.last_update,
        ];
        writer
            .write_record(fields.into_iter().map(|v| cell(v.as_ref())))
            .map_err(csv_error)?;
    }

    writer.flush()?;
    info!("Saved {} station records to {}", records.len(), path.display());
    Ok(())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::InvalidData(format!("Failed to write CSV: {}", e))
}
