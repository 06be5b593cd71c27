//! Score aggregation: per-patient category breakdowns and population means.
//!
//! Everything here is a pure function of its inputs. Values are accumulated
//! in `f64` and only rounded by the formatting helpers at the bottom.

use crate::categories::CategoryTable;
use crate::error::{ScoreError, ScoreResult};
use crate::models::{CategoryScore, MeanBySex, PatientRecord, Sex, SexStatistic};

pub const TOTAL_SCORE_MAXIMUM: f64 = 100.0;

pub fn compute_category_breakdown(
    patient: Option<&PatientRecord>,
    table: &CategoryTable,
) -> ScoreResult<Vec<CategoryScore>> {
    let patient = require_patient(patient)?;

    Ok(table
        .iter()
        .map(|definition| {
            let value = patient.scores.get(definition.category);
            CategoryScore {
                category: definition.category,
                label: definition.label.clone(),
                score: value.map(f64::from).unwrap_or(0.0),
                maximum: definition.maximum,
                missing: value.is_none(),
            }
        })
        .collect())
}

/// Stored HEIFA total, or 0.0 when absent. Never recomputed from categories.
pub fn compute_total(patient: Option<&PatientRecord>) -> ScoreResult<f64> {
    let patient = require_patient(patient)?;
    Ok(patient.total_score.map(f64::from).unwrap_or(0.0))
}

pub fn compute_mean_by_sex<'a, I>(patients: I) -> MeanBySex
where
    I: IntoIterator<Item = &'a PatientRecord>,
{
    let mut male = (0.0_f64, 0usize);
    let mut female = (0.0_f64, 0usize);

    for patient in patients {
        let Some(total) = patient.total_score.filter(|t| t.is_finite()) else {
            continue;
        };
        let entry = match patient.sex() {
            Some(Sex::Male) => &mut male,
            Some(Sex::Female) => &mut female,
            None => continue,
        };
        entry.0 += f64::from(total);
        entry.1 += 1;
    }

    MeanBySex {
        male: statistic(Sex::Male, male),
        female: statistic(Sex::Female, female),
    }
}

fn statistic(sex: Sex, (sum, count): (f64, usize)) -> SexStatistic {
    if count == 0 {
        return SexStatistic::empty(sex);
    }
    SexStatistic {
        sex,
        mean: sum / count as f64,
        count,
    }
}

fn require_patient(patient: Option<&PatientRecord>) -> ScoreResult<&PatientRecord> {
    patient.ok_or_else(|| ScoreError::InvalidArgument("patient is required".to_string()))
}

/// Round half away from zero to two decimal places. Presentation only.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn format_score(value: f64) -> String {
    format!("{:.2}", round_to_cents(value))
}

pub fn format_fraction(score: f64, maximum: f64) -> String {
    format!("{}/{}", format_score(score), format_score(maximum))
}

/// Insights-style total, e.g. `45.00/100.00`. An absent total shows as zero.
pub fn format_total(patient: &PatientRecord) -> String {
    let total = patient.total_score.map(f64::from).unwrap_or(0.0);
    format_fraction(total, TOTAL_SCORE_MAXIMUM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::{Category, CategoryDefinition};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn patient(id: &str, sex: Option<&str>, total: Option<f32>) -> PatientRecord {
        PatientRecord {
            sex: sex.map(str::to_string),
            total_score: total,
            ..PatientRecord::new(id)
        }
    }

    #[test]
    fn breakdown_follows_table_order_and_flags_missing() {
        let mut record = patient("1", Some("Male"), Some(45.0));
        record.scores.fruits = Some(3.0);
        let table = CategoryTable::new(vec![
            CategoryDefinition::new(Category::Fruits, 10.0),
            CategoryDefinition::new(Category::Vegetables, 10.0),
        ])
        .unwrap();

        let breakdown = compute_category_breakdown(Some(&record), &table).unwrap();
        let summary: Vec<(Category, f64, f64, bool)> = breakdown
            .iter()
            .map(|c| (c.category, c.score, c.maximum, c.missing))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Category::Fruits, 3.0, 10.0, false),
                (Category::Vegetables, 0.0, 10.0, true),
            ]
        );
        assert_eq!(compute_total(Some(&record)).unwrap(), 45.0);
    }

    #[test]
    fn true_zero_is_not_missing() {
        let mut record = patient("1", Some("Female"), None);
        record.scores.alcohol = Some(0.0);
        let breakdown =
            compute_category_breakdown(Some(&record), &CategoryTable::default()).unwrap();
        let alcohol = breakdown
            .iter()
            .find(|c| c.category == Category::Alcohol)
            .unwrap();
        assert_eq!(alcohol.score, 0.0);
        assert!(!alcohol.missing);
    }

    #[test]
    fn absent_patient_is_invalid_argument() {
        let table = CategoryTable::default();
        assert!(matches!(
            compute_category_breakdown(None, &table),
            Err(ScoreError::InvalidArgument(_))
        ));
        assert!(matches!(compute_total(None), Err(ScoreError::InvalidArgument(_))));
    }

    #[test]
    fn missing_total_is_zero() {
        let record = patient("1", Some("Male"), None);
        assert_eq!(compute_total(Some(&record)).unwrap(), 0.0);
    }

    #[test]
    fn empty_population_reports_zero_for_both_groups() {
        let stats = compute_mean_by_sex(std::iter::empty::<&PatientRecord>());
        assert_eq!(stats.male, SexStatistic::empty(Sex::Male));
        assert_eq!(stats.female, SexStatistic::empty(Sex::Female));
        assert!(!stats.male.mean.is_nan());
    }

    #[test]
    fn unknown_sex_is_excluded() {
        let patients = vec![
            patient("1", Some("male"), Some(40.0)),
            patient("2", Some("Other"), Some(99.0)),
            patient("3", None, Some(99.0)),
            patient("4", Some(""), Some(99.0)),
        ];
        let stats = compute_mean_by_sex(&patients);
        assert_eq!(stats.male.count, 1);
        assert_eq!(stats.male.mean, 40.0);
        assert_eq!(stats.female.count, 0);
    }

    #[test]
    fn non_finite_totals_are_left_out_of_the_mean() {
        let patients = vec![
            patient("1", Some("Male"), Some(f32::NAN)),
            patient("2", Some("Male"), Some(50.0)),
            patient("3", Some("Female"), Some(f32::INFINITY)),
        ];
        let stats = compute_mean_by_sex(&patients);
        assert_eq!((stats.male.mean, stats.male.count), (50.0, 1));
        assert_eq!(stats.female, SexStatistic::empty(Sex::Female));
    }

    #[test]
    fn formatting_rounds_at_presentation() {
        assert_eq!(round_to_cents(1.0074), 1.01);
        assert_eq!(format_score(1.0025), "1.00");
        assert_eq!(format_fraction(3.0, 10.0), "3.00/10.00");

        let scored = patient("1", Some("Male"), Some(45.0));
        assert_eq!(format_total(&scored), "45.00/100.00");

        let unscored = patient("2", Some("Male"), None);
        assert_eq!(format_total(&unscored), "0.00/100.00");
    }

    fn arb_patient() -> impl Strategy<Value = PatientRecord> {
        (
            prop_oneof![Just(Some("Male")), Just(Some("Female")), Just(Some("x")), Just(None)],
            proptest::option::of(0u32..=10_000),
            proptest::collection::vec(proptest::option::of(0.0f32..=10.0), Category::ALL.len()),
        )
            .prop_map(|(sex, total, scores)| {
                // Totals on a 0.01 grid keep the f64 sum exact enough to compare.
                let mut record = patient("p", sex, total.map(|t| t as f32 / 100.0));
                for (category, value) in Category::ALL.into_iter().zip(scores) {
                    record.scores.set(category, value);
                }
                record
            })
    }

    fn arb_table() -> impl Strategy<Value = CategoryTable> {
        (
            Just(CategoryTable::default().definitions().to_vec()).prop_shuffle(),
            1usize..=10,
        )
            .prop_map(|(definitions, take)| {
                CategoryTable::new(definitions[..take].to_vec()).unwrap()
            })
    }

    proptest! {
        #[test]
        fn mean_is_order_independent(
            (patients, shuffled) in proptest::collection::vec(arb_patient(), 0..50)
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            let original = compute_mean_by_sex(&patients);
            let reordered = compute_mean_by_sex(&shuffled);

            prop_assert_eq!(original.male.count, reordered.male.count);
            prop_assert_eq!(original.female.count, reordered.female.count);
            prop_assert!((original.male.mean - reordered.male.mean).abs() < 1e-9);
            prop_assert!((original.female.mean - reordered.female.mean).abs() < 1e-9);
        }

        #[test]
        fn breakdown_matches_table_for_every_patient(
            patient in arb_patient(),
            table in arb_table()
        ) {
            let breakdown = compute_category_breakdown(Some(&patient), &table).unwrap();
            prop_assert_eq!(breakdown.len(), table.len());
            for (entry, definition) in breakdown.iter().zip(table.iter()) {
                let stored = patient.scores.get(definition.category);
                prop_assert_eq!(entry.category, definition.category);
                prop_assert_eq!(entry.missing, stored.is_none());
                prop_assert_eq!(entry.score, stored.map(f64::from).unwrap_or(0.0));
                prop_assert!((0.0..=1.0).contains(&entry.proportion()));
            }
        }
    }
}
