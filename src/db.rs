use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::{CategoryScores, PatientRecord};

const SELECT_PATIENTS: &str = r#"
    SELECT user_id, phone_number, name, sex, heifa_total_score,
           vegetables_score, fruits_score, grains_score, meat_alternatives_score,
           dairy_score, water_score, unsaturated_fats_score, added_sugar_score,
           alcohol_score, discretionary_score
    FROM nutritrack.patients
"#;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Upsert imported patients keyed by `user_id`. Returns the number of rows written.
pub async fn import_patients(pool: &PgPool, patients: &[PatientRecord]) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    let mut written = 0usize;

    for patient in patients {
        let scores = &patient.scores;
        let result = sqlx::query(
            r#"
            INSERT INTO nutritrack.patients
            (user_id, phone_number, name, sex, heifa_total_score,
             vegetables_score, fruits_score, grains_score, meat_alternatives_score,
             dairy_score, water_score, unsaturated_fats_score, added_sugar_score,
             alcohol_score, discretionary_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (user_id) DO UPDATE
            SET phone_number = EXCLUDED.phone_number,
                name = COALESCE(EXCLUDED.name, nutritrack.patients.name),
                sex = EXCLUDED.sex,
                heifa_total_score = EXCLUDED.heifa_total_score,
                vegetables_score = EXCLUDED.vegetables_score,
                fruits_score = EXCLUDED.fruits_score,
                grains_score = EXCLUDED.grains_score,
                meat_alternatives_score = EXCLUDED.meat_alternatives_score,
                dairy_score = EXCLUDED.dairy_score,
                water_score = EXCLUDED.water_score,
                unsaturated_fats_score = EXCLUDED.unsaturated_fats_score,
                added_sugar_score = EXCLUDED.added_sugar_score,
                alcohol_score = EXCLUDED.alcohol_score,
                discretionary_score = EXCLUDED.discretionary_score
            "#,
        )
        .bind(&patient.user_id)
        .bind(&patient.phone_number)
        .bind(&patient.name)
        .bind(&patient.sex)
        .bind(patient.total_score)
        .bind(scores.vegetables)
        .bind(scores.fruits)
        .bind(scores.grains)
        .bind(scores.meat_alternatives)
        .bind(scores.dairy)
        .bind(scores.water)
        .bind(scores.unsaturated_fats)
        .bind(scores.added_sugar)
        .bind(scores.alcohol)
        .bind(scores.discretionary)
        .execute(&mut *tx)
        .await?;

        written += result.rows_affected() as usize;
    }

    tx.commit().await?;
    Ok(written)
}

pub async fn fetch_patients(pool: &PgPool) -> anyhow::Result<Vec<PatientRecord>> {
    let rows = sqlx::query(SELECT_PATIENTS).fetch_all(pool).await?;
    Ok(rows.iter().map(patient_from_row).collect())
}

pub async fn fetch_patient(pool: &PgPool, user_id: &str) -> anyhow::Result<Option<PatientRecord>> {
    let query = format!("{SELECT_PATIENTS} WHERE user_id = $1");
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(patient_from_row))
}

pub async fn count_patients(pool: &PgPool) -> anyhow::Result<i64> {
    let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM nutritrack.patients")
        .fetch_one(pool)
        .await?
        .get("count");
    Ok(count)
}

/// `REAL` columns can hold NaN or infinity; treat those as no score.
fn finite(value: Option<f32>) -> Option<f32> {
    value.filter(|v| v.is_finite())
}

fn patient_from_row(row: &PgRow) -> PatientRecord {
    PatientRecord {
        user_id: row.get("user_id"),
        phone_number: row.get("phone_number"),
        name: row.get("name"),
        sex: row.get("sex"),
        total_score: finite(row.get("heifa_total_score")),
        scores: CategoryScores {
            vegetables: finite(row.get("vegetables_score")),
            fruits: finite(row.get("fruits_score")),
            grains: finite(row.get("grains_score")),
            meat_alternatives: finite(row.get("meat_alternatives_score")),
            dairy: finite(row.get("dairy_score")),
            water: finite(row.get("water_score")),
            unsaturated_fats: finite(row.get("unsaturated_fats_score")),
            added_sugar: finite(row.get("added_sugar_score")),
            alcohol: finite(row.get("alcohol_score")),
            discretionary: finite(row.get("discretionary_score")),
        },
    }
}
