use std::collections::HashMap;
use std::future::Future;
use std::path::Path;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::db;
use crate::import;
use crate::models::PatientRecord;

/// Read-side access to patient records. Errors are returned as-is; the
/// scoring code never retries or swallows them.
pub trait PatientRepository {
    /// Snapshot of every patient, in no particular order.
    fn all_patients(&self) -> impl Future<Output = anyhow::Result<Vec<PatientRecord>>> + Send;

    fn patient_by_id(
        &self,
        user_id: &str,
    ) -> impl Future<Output = anyhow::Result<Option<PatientRecord>>> + Send;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryRepository {
    patients: HashMap<String, PatientRecord>,
}

impl MemoryRepository {
    /// Later records replace earlier ones with the same `user_id`.
    pub fn from_records(records: Vec<PatientRecord>) -> Self {
        let mut patients = HashMap::with_capacity(records.len());
        for record in records {
            if let Some(previous) = patients.insert(record.user_id.clone(), record) {
                warn!(user_id = %previous.user_id, "duplicate user id replaced");
            }
        }
        Self { patients }
    }

    pub fn from_csv(path: &Path) -> anyhow::Result<Self> {
        let summary = import::read_patients_csv(path)?;
        info!(
            path = %path.display(),
            patients = summary.patients.len(),
            skipped = summary.skipped_rows,
            unknown_sex = summary.unknown_sex_rows,
            "loaded patients from csv"
        );
        Ok(Self::from_records(summary.patients))
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}

impl PatientRepository for MemoryRepository {
    async fn all_patients(&self) -> anyhow::Result<Vec<PatientRecord>> {
        Ok(self.patients.values().cloned().collect())
    }

    async fn patient_by_id(&self, user_id: &str) -> anyhow::Result<Option<PatientRecord>> {
        Ok(self.patients.get(user_id).cloned())
    }
}

#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl PatientRepository for PgRepository {
    async fn all_patients(&self) -> anyhow::Result<Vec<PatientRecord>> {
        db::fetch_patients(&self.pool).await
    }

    async fn patient_by_id(&self, user_id: &str) -> anyhow::Result<Option<PatientRecord>> {
        db::fetch_patient(&self.pool, user_id).await
    }
}
