use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::categories::CategoryTable;

/// Where patient records are read from.
#[derive(Debug, Clone, PartialEq)]
pub enum PatientSource {
    Csv(PathBuf),
    Postgres(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: PatientSource,
    pub categories: CategoryTable,
}

impl AppConfig {
    /// A CSV source wins over a database URL when both are given.
    pub fn resolve(
        csv: Option<PathBuf>,
        database_url: Option<String>,
        categories: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let source = match (csv, database_url) {
            (Some(path), _) => PatientSource::Csv(path),
            (None, Some(url)) => PatientSource::Postgres(url),
            (None, None) => anyhow::bail!("either --csv or DATABASE_URL must be set"),
        };

        let categories = match categories {
            Some(path) => CategoryTable::from_json_file(path)
                .with_context(|| format!("invalid category table {}", path.display()))?,
            None => CategoryTable::default(),
        };

        Ok(Self { source, categories })
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        match &self.source {
            PatientSource::Postgres(url) => Ok(url),
            PatientSource::Csv(_) => anyhow::bail!("this command requires DATABASE_URL"),
        }
    }
}
