use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::catalog::record::CatalogRecord;
use crate::error::CatalogError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    #[serde(flatten)]
    pub record: CatalogRecord,
    pub created_at: DateTime<Utc>,
}

/// Records kept in insertion order; the newest is at the end.
#[derive(Debug, Default)]
pub struct CatalogStore {
    records: Vec<StoredRecord>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record`, replacing an existing record with the same `id` or `name`.
    ///
    /// A slug already used by a record that is not being replaced is a
    /// duplicate-key error.
    pub fn upsert(&mut self, record: CatalogRecord) -> Result<StoredRecord, CatalogError> {
        let record = record.normalized();
        record.validate()?;

        let replaced = self
            .records
            .iter()
            .position(|stored| stored.record.id == record.id || stored.record.name == record.name);

        // Only one conflicting record is replaced; any other clash is a duplicate key.
        for (index, stored) in self.records.iter().enumerate() {
            if Some(index) == replaced {
                continue;
            }
            if stored.record.id == record.id {
                return Err(CatalogError::Duplicate {
                    field: "id",
                    value: record.id.to_string(),
                });
            }
            if stored.record.name == record.name {
                return Err(CatalogError::Duplicate {
                    field: "name",
                    value: record.name,
                });
            }
            if stored.record.slug == record.slug {
                return Err(CatalogError::Duplicate {
                    field: "slug",
                    value: record.slug,
                });
            }
        }

        if let Some(index) = replaced {
            let previous = self.records.remove(index);
            let key = if previous.record.id == record.id { "id" } else { "name" };
            info!("Record with same {} already exists, replacing {}", key, previous.record.name);
        }

        let stored = StoredRecord {
            record,
            created_at: Utc::now(),
        };
        self.records.push(stored.clone());
        Ok(stored)
    }

    /// The most recently created record.
    pub fn latest(&self) -> Option<&StoredRecord> {
        self.records.last()
    }

    pub fn all(&self) -> &[StoredRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotInfo {
    #[serde(default)]
    pub id: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct ScreenshotStore {
    screenshots: Vec<ScreenshotInfo>,
}

impl ScreenshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image_url: impl Into<String>) -> ScreenshotInfo {
        let info = ScreenshotInfo {
            id: Uuid::new_v4().to_string(),
            image_url: image_url.into(),
            created_at: Some(Utc::now()),
        };
        self.screenshots.push(info.clone());
        info
    }

    pub fn latest(&self) -> Option<&ScreenshotInfo> {
        self.screenshots.last()
    }

    pub fn len(&self) -> usize {
        self.screenshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screenshots.is_empty()
    }
}
