//! Local resumption store.
//!
//! One reservation snapshot persists on the device under a single
//! well-known key. It is written once at submit success, read once at
//! boot, and deleted as soon as the referenced reservation stops being
//! resumable. A snapshot that fails to parse is cleared on the spot
//! rather than surfaced as an error.

use crate::constants::RESUMPTION_FILE;
use crate::error::{Result, WizardError};
use crate::state::{ReservationRecord, ReservationType};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};

/// The serialized subset of a confirmed reservation kept on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalResumptionRecord {
    /// Server id.
    pub id: String,
    /// Locator code.
    pub code: String,
    /// QR image URL.
    pub qr_url: String,
    /// Unit display label.
    pub unit_label: String,
    /// Area display name.
    pub area_name: String,
    /// Formatted date, `DD/MM/YYYY`.
    pub date_str: String,
    /// Formatted time, `HH:MM`.
    pub time_str: String,
    /// Total party size.
    pub people: u32,
    /// Children in the party.
    pub kids: u32,
    /// Guest name hint.
    pub full_name: Option<String>,
    /// CPF hint.
    pub cpf: Option<String>,
    /// Email hint.
    pub email_hint: Option<String>,
    /// Reservation type at save time.
    pub reservation_type: Option<ReservationType>,
}

impl LocalResumptionRecord {
    /// Snapshot a confirmed record for later resumption.
    #[must_use]
    pub fn from_record(
        record: &ReservationRecord,
        qr_url: String,
        reservation_type: ReservationType,
    ) -> Self {
        Self {
            id: record.id.as_str().to_string(),
            code: record.code.clone(),
            qr_url,
            unit_label: record.unit_label.clone(),
            area_name: record.area_name.clone(),
            date_str: record.reservation_at.format("%d/%m/%Y").to_string(),
            time_str: record.reservation_at.format("%H:%M").to_string(),
            people: record.people,
            kids: record.kids,
            full_name: record.full_name.clone(),
            cpf: record.cpf.clone(),
            email_hint: record.email.clone(),
            reservation_type: Some(reservation_type),
        }
    }
}

/// Device-local persistence for the last created reservation.
pub trait ResumptionStore: Send + Sync {
    /// Persist the snapshot, replacing any previous one.
    fn save(&self, record: &LocalResumptionRecord) -> impl Future<Output = Result<()>> + Send;

    /// Read the stored snapshot.
    ///
    /// A snapshot that fails to parse is deleted and reported as absent
    /// (corrupt-state self-heal), never as an error.
    fn load(&self) -> impl Future<Output = Result<Option<LocalResumptionRecord>>> + Send;

    /// Delete the stored snapshot. Deleting an absent snapshot is fine.
    fn clear(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Resumption store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileResumptionStore {
    path: PathBuf,
}

impl FileResumptionStore {
    /// Store the snapshot under `dir`, using the well-known file name.
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(RESUMPTION_FILE),
        }
    }

    /// The file holding the snapshot.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage_err(err: &std::io::Error) -> WizardError {
    WizardError::Storage(err.to_string())
}

impl ResumptionStore for FileResumptionStore {
    async fn save(&self, record: &LocalResumptionRecord) -> Result<()> {
        let json = serde_json::to_string(record)
            .map_err(|e| WizardError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| storage_err(&e))
    }

    async fn load(&self) -> Result<Option<LocalResumptionRecord>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_err(&e)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                tracing::warn!(%err, "corrupt resumption record, clearing");
                self.clear().await?;
                Ok(None)
            },
        }
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err(&e)),
        }
    }
}
