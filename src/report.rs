use std::fmt::Write;

use chrono::NaiveDate;

use crate::categories::{Category, CategoryTable};
use crate::error::ScoreResult;
use crate::models::{PatientRecord, SexStatistic};
use crate::score::{self, format_score};
use crate::validate;

const MAX_LISTED_ISSUES: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAverage {
    pub category: Category,
    pub label: String,
    pub mean: f64,
    pub maximum: f64,
    pub count: usize,
}

/// Mean of each category among the patients that have it. Unscored patients
/// do not drag the average towards zero.
pub fn summarize_categories(
    patients: &[PatientRecord],
    table: &CategoryTable,
) -> Vec<CategoryAverage> {
    table
        .iter()
        .map(|definition| {
            let (sum, count) = patients
                .iter()
                .filter_map(|p| p.scores.get(definition.category))
                .fold((0.0_f64, 0usize), |(sum, count), value| {
                    (sum + f64::from(value), count + 1)
                });
            CategoryAverage {
                category: definition.category,
                label: definition.label.clone(),
                mean: if count == 0 { 0.0 } else { sum / count as f64 },
                maximum: definition.maximum,
                count,
            }
        })
        .collect()
}

pub fn build_report(
    label: Option<&str>,
    generated_on: NaiveDate,
    patients: &[PatientRecord],
    table: &CategoryTable,
) -> String {
    let means = score::compute_mean_by_sex(patients);
    let categories = summarize_categories(patients, table);
    let mut issues = validate::validate_population(patients, table);
    let differing_totals = patients
        .iter()
        .filter(|p| validate::total_sum_difference(p, table).is_some())
        .count();

    let missing_total = patients.iter().filter(|p| p.total_score.is_none()).count();
    let unknown_sex = patients.iter().filter(|p| p.sex().is_none()).count();

    let mut output = String::new();
    let source_label = label.unwrap_or("all patients");

    let _ = writeln!(output, "# HEIFA Score Report");
    let _ = writeln!(output, "Generated for {} on {}", source_label, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Mean Score by Sex");
    for stat in [&means.male, &means.female] {
        let _ = writeln!(output, "{}", stat_line(stat));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Population");
    let _ = writeln!(output, "- {} patients on record", patients.len());
    let _ = writeln!(output, "- {} without a total score", missing_total);
    let _ = writeln!(output, "- {} with unrecognised sex (excluded from means)", unknown_sex);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Averages");
    for average in categories.iter() {
        if average.count == 0 {
            let _ = writeln!(output, "- {}: no scores recorded", average.label);
        } else {
            let _ = writeln!(
                output,
                "- {}: {} across {} patients",
                average.label,
                score::format_fraction(average.mean, average.maximum),
                average.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Quality");
    if issues.is_empty() {
        let _ = writeln!(output, "No score issues found.");
    } else {
        let _ = writeln!(output, "{} patients with score issues.", issues.len());
        issues.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        let listed = issues
            .iter()
            .flat_map(|entry| entry.issues.iter().map(move |issue| (&entry.user_id, issue)))
            .take(MAX_LISTED_ISSUES);
        for (user_id, issue) in listed {
            let _ = writeln!(output, "- {}: {}", user_id, issue);
        }
    }

    if differing_totals > 0 {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Totals vs Category Sums");
        let _ = writeln!(
            output,
            "{} fully scored patients have a HEIFA total that differs from their category sum. \
             Expected: the total includes components outside the category table.",
            differing_totals
        );
    }

    output
}

/// Text breakdown for one patient: a line per category plus the total.
pub fn build_breakdown(
    patient: Option<&PatientRecord>,
    table: &CategoryTable,
) -> ScoreResult<String> {
    let breakdown = score::compute_category_breakdown(patient, table)?;

    let mut output = String::new();
    if let Some(patient) = patient {
        let _ = writeln!(output, "Category scores for {}:", patient.user_id);
        for entry in &breakdown {
            let marker = if entry.missing { " (no data)" } else { "" };
            let _ = writeln!(
                output,
                "- {}: {} ({:.0}%){}",
                entry.label,
                score::format_fraction(entry.score, entry.maximum),
                entry.proportion() * 100.0,
                marker
            );
        }
        let _ = writeln!(output, "Total food quality score: {}", score::format_total(patient));
    }
    Ok(output)
}

/// JSON form of [`build_breakdown`], with the progress proportion per category.
pub fn breakdown_json(
    patient: Option<&PatientRecord>,
    table: &CategoryTable,
) -> ScoreResult<serde_json::Value> {
    let breakdown = score::compute_category_breakdown(patient, table)?;
    let total = score::compute_total(patient)?;

    let categories: Vec<serde_json::Value> = breakdown
        .iter()
        .map(|entry| {
            serde_json::json!({
                "category": entry.category,
                "label": entry.label,
                "score": entry.score,
                "maximum": entry.maximum,
                "missing": entry.missing,
                "proportion": entry.proportion(),
            })
        })
        .collect();

    Ok(serde_json::json!({
        "user_id": patient.map(|p| p.user_id.as_str()),
        "categories": categories,
        "total": total,
        "total_display": patient.map(score::format_total),
    }))
}

fn stat_line(stat: &SexStatistic) -> String {
    format!(
        "- {:?}: {} across {} patients",
        stat.sex,
        format_score(stat.mean),
        stat.count
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(id: &str, sex: &str, total: Option<f32>, fruit: Option<f32>) -> PatientRecord {
        let mut record = PatientRecord {
            sex: Some(sex.to_string()),
            total_score: total,
            ..PatientRecord::new(id)
        };
        record.scores.fruits = fruit;
        record
    }

    #[test]
    fn category_average_ignores_missing_scores() {
        let patients = vec![
            patient("1", "Male", None, Some(4.0)),
            patient("2", "Male", None, Some(8.0)),
            patient("3", "Male", None, None),
        ];
        let averages = summarize_categories(&patients, &CategoryTable::default());
        let fruit = averages
            .iter()
            .find(|a| a.category == Category::Fruits)
            .unwrap();
        assert_eq!(fruit.mean, 6.0);
        assert_eq!(fruit.count, 2);
    }

    #[test]
    fn report_lists_means_and_population() {
        let patients = vec![
            patient("1", "Male", Some(50.0), Some(4.0)),
            patient("2", "Male", Some(60.0), None),
            patient("3", "Female", Some(80.0), Some(12.0)),
            patient("4", "n/a", None, None),
        ];
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let report = build_report(None, date, &patients, &CategoryTable::default());

        assert!(report.contains("Generated for all patients on 2026-03-01"));
        assert!(report.contains("- Male: 55.00 across 2 patients"));
        assert!(report.contains("- Female: 80.00 across 1 patients"));
        assert!(report.contains("- 1 without a total score"));
        assert!(report.contains("- 1 with unrecognised sex"));
        assert!(report.contains("- Fruits: 8.00/10.00 across 2 patients"));
        assert!(report.contains("- Water: no scores recorded"));
        assert!(report.contains("- 3: Fruits score 12.00 outside 0-10.00"));
    }

    #[test]
    fn differing_totals_are_noted_outside_data_quality() {
        let mut full = patient("2", "Male", Some(62.0), None);
        for category in Category::ALL {
            full.scores.set(category, Some(5.0));
        }
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let report = build_report(None, date, &[full], &CategoryTable::default());

        assert!(report.contains("No score issues found."));
        assert!(!report.contains("patients with score issues"));
        assert!(report.contains("1 fully scored patients have a HEIFA total"));
    }

    #[test]
    fn issue_listing_is_capped_per_issue() {
        let mut noisy = patient("9", "Female", Some(150.0), None);
        for category in Category::ALL {
            noisy.scores.set(category, Some(-1.0));
        }
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let report = build_report(None, date, &[noisy], &CategoryTable::default());

        assert!(report.contains("1 patients with score issues."));
        let listed = report.lines().filter(|l| l.starts_with("- 9: ")).count();
        assert_eq!(listed, MAX_LISTED_ISSUES);
    }

    #[test]
    fn breakdown_text_uses_total_and_proportion() {
        let mut record = patient("7", "Male", Some(45.0), Some(3.0));
        record.scores.water = Some(5.0);
        let table = CategoryTable::default();
        let text = build_breakdown(Some(&record), &table).unwrap();

        assert!(text.starts_with("Category scores for 7:"));
        assert!(text.contains("- Fruits: 3.00/10.00 (30%)\n"));
        assert!(text.contains("- Water: 5.00/5.00 (100%)\n"));
        assert!(text.contains("- Vegetables: 0.00/10.00 (0%) (no data)"));
        assert!(text.contains("Total food quality score: 45.00/100.00"));
        assert!(build_breakdown(None, &table).is_err());
    }

    #[test]
    fn breakdown_json_carries_proportion() {
        let record = patient("7", "Female", None, Some(2.5));
        let value = breakdown_json(Some(&record), &CategoryTable::default()).unwrap();

        let fruit = value["categories"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["category"] == "fruits")
            .unwrap();
        assert_eq!(fruit["proportion"], 0.25);
        assert_eq!(fruit["missing"], false);
        assert_eq!(value["total"], 0.0);
        assert_eq!(value["total_display"], "0.00/100.00");
    }

    #[test]
    fn empty_population_report_is_well_formed() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let report = build_report(Some("clinic"), date, &[], &CategoryTable::default());
        assert!(report.contains("- Male: 0.00 across 0 patients"));
        assert!(report.contains("No score issues found."));
    }
}
