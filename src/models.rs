use serde::{Deserialize, Serialize};

use crate::categories::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Case-insensitive match against "Male" / "Female". Anything else has no sex.
    pub fn parse(raw: &str) -> Option<Sex> {
        let value = raw.trim();
        if value.eq_ignore_ascii_case("male") {
            Some(Sex::Male)
        } else if value.eq_ignore_ascii_case("female") {
            Some(Sex::Female)
        } else {
            None
        }
    }

    /// Suffix the bulk-import CSV appends to sex-specific score columns.
    pub fn column_suffix(self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub vegetables: Option<f32>,
    pub fruits: Option<f32>,
    pub grains: Option<f32>,
    pub meat_alternatives: Option<f32>,
    pub dairy: Option<f32>,
    pub water: Option<f32>,
    pub unsaturated_fats: Option<f32>,
    pub added_sugar: Option<f32>,
    pub alcohol: Option<f32>,
    pub discretionary: Option<f32>,
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> Option<f32> {
        match category {
            Category::Vegetables => self.vegetables,
            Category::Fruits => self.fruits,
            Category::Grains => self.grains,
            Category::MeatAlternatives => self.meat_alternatives,
            Category::Dairy => self.dairy,
            Category::Water => self.water,
            Category::UnsaturatedFats => self.unsaturated_fats,
            Category::AddedSugar => self.added_sugar,
            Category::Alcohol => self.alcohol,
            Category::Discretionary => self.discretionary,
        }
    }

    pub fn set(&mut self, category: Category, value: Option<f32>) {
        let slot = match category {
            Category::Vegetables => &mut self.vegetables,
            Category::Fruits => &mut self.fruits,
            Category::Grains => &mut self.grains,
            Category::MeatAlternatives => &mut self.meat_alternatives,
            Category::Dairy => &mut self.dairy,
            Category::Water => &mut self.water,
            Category::UnsaturatedFats => &mut self.unsaturated_fats,
            Category::AddedSugar => &mut self.added_sugar,
            Category::Alcohol => &mut self.alcohol,
            Category::Discretionary => &mut self.discretionary,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub user_id: String,
    pub phone_number: Option<String>,
    pub name: Option<String>,
    /// Raw value from the import; see [`PatientRecord::sex`].
    pub sex: Option<String>,
    pub scores: CategoryScores,
    /// HEIFA total, 0-100. Sourced externally, not derived from `scores`.
    pub total_score: Option<f32>,
}

impl PatientRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            phone_number: None,
            name: None,
            sex: None,
            scores: CategoryScores::default(),
            total_score: None,
        }
    }

    pub fn sex(&self) -> Option<Sex> {
        self.sex.as_deref().and_then(Sex::parse)
    }
}

/// One line of a patient's category breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub category: Category,
    pub label: String,
    /// 0.0 when `missing` is set.
    pub score: f64,
    pub maximum: f64,
    pub missing: bool,
}

impl CategoryScore {
    /// Fill ratio for a progress indicator, clamped to [0, 1].
    pub fn proportion(&self) -> f64 {
        if self.maximum > 0.0 {
            (self.score / self.maximum).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SexStatistic {
    pub sex: Sex,
    pub mean: f64,
    pub count: usize,
}

impl SexStatistic {
    pub fn empty(sex: Sex) -> Self {
        Self {
            sex,
            mean: 0.0,
            count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanBySex {
    pub male: SexStatistic,
    pub female: SexStatistic,
}

impl MeanBySex {
    pub fn get(&self, sex: Sex) -> &SexStatistic {
        match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sex_parse_is_case_insensitive_and_strict() {
        assert_eq!(Sex::parse("Male"), Some(Sex::Male));
        assert_eq!(Sex::parse("FEMALE"), Some(Sex::Female));
        assert_eq!(Sex::parse(" male "), Some(Sex::Male));
        assert_eq!(Sex::parse(""), None);
        assert_eq!(Sex::parse("Other"), None);
        assert_eq!(Sex::parse("M"), None);
    }

    #[test]
    fn scores_are_addressable_by_category() {
        let mut scores = CategoryScores::default();
        for (i, category) in Category::ALL.iter().enumerate() {
            scores.set(*category, Some(i as f32));
        }
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(scores.get(*category), Some(i as f32));
        }
    }

    #[test]
    fn proportion_is_clamped() {
        let entry = CategoryScore {
            category: Category::Water,
            label: "Water".to_string(),
            score: 7.5,
            maximum: 5.0,
            missing: false,
        };
        assert_eq!(entry.proportion(), 1.0);

        let half = CategoryScore {
            score: 2.5,
            ..entry
        };
        assert_eq!(half.proportion(), 0.5);
    }
}
