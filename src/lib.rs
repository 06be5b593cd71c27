//! HEIFA nutrition score aggregation.
//!
//! Patients carry an externally computed HEIFA total and per-category
//! sub-scores. [`score`] turns them into per-patient breakdowns and
//! population means by sex; [`import`] and [`repository`] supply the records.

pub mod categories;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod report;
pub mod repository;
pub mod score;
pub mod validate;

pub use categories::{Category, CategoryDefinition, CategoryTable};
pub use error::{ScoreError, ScoreResult};
pub use models::{CategoryScore, MeanBySex, PatientRecord, Sex, SexStatistic};
pub use score::{compute_category_breakdown, compute_mean_by_sex, compute_total};
