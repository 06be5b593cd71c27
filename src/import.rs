//! Bulk-import CSV decoding.
//!
//! Score columns come in sex-specific pairs (`FruitHEIFAscoreMale`,
//! `FruitHEIFAscoreFemale`); each row reads the pair matching its own sex.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use csv::StringRecord;
use tracing::{debug, warn};

use crate::categories::Category;
use crate::models::{CategoryScores, PatientRecord, Sex};

const USER_ID: &str = "User_ID";
const PHONE_NUMBER: &str = "PhoneNumber";
const SEX: &str = "Sex";
const NAME: &str = "Name";
const TOTAL_BASE: &str = "HEIFAtotalscore";

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub patients: Vec<PatientRecord>,
    pub skipped_rows: usize,
    pub unknown_sex_rows: usize,
}

pub fn score_column(base: &str, sex: Sex) -> String {
    format!("{base}HEIFAscore{}", sex.column_suffix())
}

pub fn total_column(sex: Sex) -> String {
    format!("{TOTAL_BASE}{}", sex.column_suffix())
}

pub fn read_patients_csv(path: &Path) -> anyhow::Result<ImportSummary> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_patients(file).with_context(|| format!("failed to import {}", path.display()))
}

pub fn read_patients<R: Read>(input: R) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let columns = ColumnIndex::new(&headers);

    let user_id_idx = columns.require(USER_ID)?;
    let phone_idx = columns.require(PHONE_NUMBER)?;
    let sex_idx = columns.require(SEX)?;
    let name_idx = columns.get(NAME);
    let essential = user_id_idx.max(phone_idx).max(sex_idx);

    let mut summary = ImportSummary::default();

    for (row_number, result) in reader.records().enumerate() {
        let record = result?;
        let line = row_number + 2;

        if record.len() <= essential {
            warn!(line, "skipping row without the essential columns");
            summary.skipped_rows += 1;
            continue;
        }

        let user_id = record[user_id_idx].to_string();
        if user_id.is_empty() {
            warn!(line, "skipping row with an empty {USER_ID}");
            summary.skipped_rows += 1;
            continue;
        }

        let raw_sex = record[sex_idx].to_string();
        let sex = Sex::parse(&raw_sex);

        let mut scores = CategoryScores::default();
        let mut total_score = None;

        match sex {
            Some(sex) => {
                for category in Category::ALL {
                    let column = score_column(category.csv_base(), sex);
                    scores.set(category, columns.score(&record, &column, &user_id));
                }
                total_score = columns.score(&record, &total_column(sex), &user_id);
            }
            None => {
                warn!(%user_id, sex = %raw_sex, "unrecognised sex, scores left empty");
                summary.unknown_sex_rows += 1;
            }
        }

        let name = name_idx
            .and_then(|idx| record.get(idx))
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        summary.patients.push(PatientRecord {
            user_id,
            phone_number: Some(record[phone_idx].to_string()).filter(|v| !v.is_empty()),
            name,
            sex: Some(raw_sex).filter(|v| !v.is_empty()),
            scores,
            total_score,
        });
    }

    debug!(
        patients = summary.patients.len(),
        skipped = summary.skipped_rows,
        "csv decoded"
    );
    Ok(summary)
}

struct ColumnIndex {
    by_name: HashMap<String, usize>,
}

impl ColumnIndex {
    fn new(headers: &StringRecord) -> Self {
        let by_name = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        Self { by_name }
    }

    fn get(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    fn require(&self, name: &str) -> anyhow::Result<usize> {
        match self.get(name) {
            Some(idx) => Ok(idx),
            None => bail!("missing required column {name}"),
        }
    }

    fn score(&self, record: &StringRecord, column: &str, user_id: &str) -> Option<f32> {
        let raw = record.get(self.get(column)?)?;
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<f32>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                warn!(%user_id, column, value = raw, "unparseable score treated as missing");
                None
            }
        }
    }
}
