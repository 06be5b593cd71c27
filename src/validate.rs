//! Data-quality checks. Issues are reported, never corrected.

use std::fmt;

use crate::categories::{Category, CategoryTable};
use crate::models::PatientRecord;
use crate::score::TOTAL_SCORE_MAXIMUM;

/// Tolerance between a total and its category sum before it is noted.
pub const SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreIssue {
    OutOfRange {
        category: Category,
        score: f64,
        maximum: f64,
    },
    TotalOutOfRange {
        total: f64,
    },
}

impl fmt::Display for ScoreIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreIssue::OutOfRange {
                category,
                score,
                maximum,
            } => write!(f, "{category} score {score:.2} outside 0-{maximum:.2}"),
            ScoreIssue::TotalOutOfRange { total } => {
                write!(f, "total score {total:.2} outside 0-{TOTAL_SCORE_MAXIMUM:.2}")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatientIssues {
    pub user_id: String,
    pub issues: Vec<ScoreIssue>,
}

/// A HEIFA total that does not match its category sum. Not an issue: the
/// total includes components outside the category table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SumDifference {
    pub total: f64,
    pub category_sum: f64,
}

pub fn validate_patient(patient: &PatientRecord, table: &CategoryTable) -> Vec<ScoreIssue> {
    let mut issues = Vec::new();

    for definition in table {
        if let Some(value) = patient.scores.get(definition.category) {
            let score = f64::from(value);
            if !(0.0..=definition.maximum).contains(&score) {
                issues.push(ScoreIssue::OutOfRange {
                    category: definition.category,
                    score,
                    maximum: definition.maximum,
                });
            }
        }
    }

    if let Some(total) = patient.total_score.map(f64::from) {
        if !(0.0..=TOTAL_SCORE_MAXIMUM).contains(&total) {
            issues.push(ScoreIssue::TotalOutOfRange { total });
        }
    }

    issues
}

/// Compares the total with the category sum. Only meaningful when the table
/// covers every category and the patient has all of them.
pub fn total_sum_difference(
    patient: &PatientRecord,
    table: &CategoryTable,
) -> Option<SumDifference> {
    if Category::ALL.iter().any(|c| table.get(*c).is_none()) {
        return None;
    }

    let total = f64::from(patient.total_score?);
    let mut category_sum = 0.0_f64;
    for definition in table {
        category_sum += f64::from(patient.scores.get(definition.category)?);
    }

    if (total - category_sum).abs() > SUM_TOLERANCE {
        Some(SumDifference {
            total,
            category_sum,
        })
    } else {
        None
    }
}

pub fn validate_population<'a, I>(patients: I, table: &CategoryTable) -> Vec<PatientIssues>
where
    I: IntoIterator<Item = &'a PatientRecord>,
{
    patients
        .into_iter()
        .filter_map(|patient| {
            let issues = validate_patient(patient, table);
            if issues.is_empty() {
                None
            } else {
                Some(PatientIssues {
                    user_id: patient.user_id.clone(),
                    issues,
                })
            }
        })
        .collect()
}
