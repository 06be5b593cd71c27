use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ScoreError, ScoreResult};

/// HEIFA food groups a patient carries a sub-score for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Vegetables,
    Fruits,
    Grains,
    MeatAlternatives,
    Dairy,
    Water,
    UnsaturatedFats,
    AddedSugar,
    Alcohol,
    Discretionary,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Vegetables,
        Category::Fruits,
        Category::Grains,
        Category::MeatAlternatives,
        Category::Dairy,
        Category::Water,
        Category::UnsaturatedFats,
        Category::AddedSugar,
        Category::Alcohol,
        Category::Discretionary,
    ];

    /// Column stem used by the bulk-import CSV, e.g. `FruitHEIFAscoreMale`.
    pub fn csv_base(self) -> &'static str {
        match self {
            Category::Vegetables => "Vegetables",
            Category::Fruits => "Fruit",
            Category::Grains => "Grainsandcereals",
            Category::MeatAlternatives => "Meatandalternatives",
            Category::Dairy => "Dairyandalternatives",
            Category::Water => "Water",
            Category::UnsaturatedFats => "UnsaturatedFat",
            Category::AddedSugar => "Sugar",
            Category::Alcohol => "Alcohol",
            Category::Discretionary => "Discretionary",
        }
    }

    pub fn default_label(self) -> &'static str {
        match self {
            Category::Vegetables => "Vegetables",
            Category::Fruits => "Fruits",
            Category::Grains => "Grains & Cereals",
            Category::MeatAlternatives => "Meat & Alternatives",
            Category::Dairy => "Dairy & Alternatives",
            Category::Water => "Water",
            Category::UnsaturatedFats => "Unsaturated Fats",
            Category::AddedSugar => "Added Sugar",
            Category::Alcohol => "Alcohol",
            Category::Discretionary => "Discretionary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub category: Category,
    pub label: String,
    pub maximum: f64,
}

impl CategoryDefinition {
    pub fn new(category: Category, maximum: f64) -> Self {
        Self {
            category,
            label: category.default_label().to_string(),
            maximum,
        }
    }
}

/// Ordered category table. Order is presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    definitions: Vec<CategoryDefinition>,
}

impl CategoryTable {
    pub fn new(definitions: Vec<CategoryDefinition>) -> ScoreResult<Self> {
        if definitions.is_empty() {
            return Err(ScoreError::InvalidCategoryTable(
                "table must contain at least one category".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for definition in &definitions {
            if !definition.maximum.is_finite() || definition.maximum <= 0.0 {
                return Err(ScoreError::InvalidCategoryTable(format!(
                    "{} has non-positive maximum {}",
                    definition.label, definition.maximum
                )));
            }
            if !seen.insert(definition.category) {
                return Err(ScoreError::InvalidCategoryTable(format!(
                    "{:?} appears more than once",
                    definition.category
                )));
            }
        }

        Ok(Self { definitions })
    }

    pub fn from_json_str(raw: &str) -> ScoreResult<Self> {
        let definitions: Vec<CategoryDefinition> = serde_json::from_str(raw)
            .map_err(|err| ScoreError::InvalidCategoryTable(err.to_string()))?;
        Self::new(definitions)
    }

    pub fn from_json_file(path: &Path) -> ScoreResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| ScoreError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_json_str(&raw).map_err(|err| ScoreError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn definitions(&self) -> &[CategoryDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CategoryDefinition> {
        self.definitions.iter()
    }

    pub fn get(&self, category: Category) -> Option<&CategoryDefinition> {
        self.definitions.iter().find(|d| d.category == category)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        let definitions = Category::ALL
            .iter()
            .map(|&category| {
                let maximum = match category {
                    Category::Water | Category::Alcohol => 5.0,
                    _ => 10.0,
                };
                CategoryDefinition::new(category, maximum)
            })
            .collect();
        Self { definitions }
    }
}

impl<'a> IntoIterator for &'a CategoryTable {
    type Item = &'a CategoryDefinition;
    type IntoIter = std::slice::Iter<'a, CategoryDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.iter()
    }
}
