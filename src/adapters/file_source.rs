use crate::core::{RecordSource, Storage};
use crate::domain::model::{Item, Unit};
use crate::utils::error::{FlowError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Reads units and items from CSV or JSON files, chosen by extension.
pub struct FileSource<S: Storage> {
    storage: S,
    units_path: String,
    items_path: String,
}

impl<S: Storage> FileSource<S> {
    pub fn new(storage: S, units_path: impl Into<String>, items_path: impl Into<String>) -> Self {
        Self {
            storage,
            units_path: units_path.into(),
            items_path: items_path.into(),
        }
    }

    async fn read<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let data = self.storage.read_file(path).await?;
        tracing::debug!("Read {} bytes from {}", data.len(), path);
        parse_records(path, &data)
    }
}

pub fn parse_records<T: DeserializeOwned>(path: &str, data: &[u8]) -> Result<Vec<T>> {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    match extension {
        "json" => Ok(serde_json::from_slice(data)?),
        "csv" => {
            let mut reader = csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_reader(data);
            let records = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
            Ok(records)
        }
        other => Err(FlowError::InvalidConfigValueError {
            field: "source".to_string(),
            value: path.to_string(),
            reason: format!("Unsupported file extension '{}'. Allowed extensions: csv, json", other),
        }),
    }
}

#[async_trait]
impl<S: Storage> RecordSource for FileSource<S> {
    async fn units(&self) -> Result<Vec<Unit>> {
        self.read(&self.units_path).await
    }

    async fn items(&self) -> Result<Vec<Item>> {
        self.read(&self.items_path).await
    }
}
