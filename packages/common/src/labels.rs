use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dish category a recipe can be filed under.
///
/// Serialized as the lower-case label (e.g. `"main course"`), which is also the
/// value stored in the recipe's `categories` column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Category {
    #[serde(rename = "main course")]
    MainCourse,
    #[serde(rename = "side dish")]
    SideDish,
    #[serde(rename = "dessert")]
    Dessert,
    #[serde(rename = "appetizer")]
    Appetizer,
    #[serde(rename = "salad")]
    Salad,
    #[serde(rename = "bread")]
    Bread,
    #[serde(rename = "breakfast")]
    Breakfast,
    #[serde(rename = "soup")]
    Soup,
    #[serde(rename = "beverage")]
    Beverage,
    #[serde(rename = "sauce")]
    Sauce,
    #[serde(rename = "marinade")]
    Marinade,
    #[serde(rename = "fingerfood")]
    Fingerfood,
    #[serde(rename = "snack")]
    Snack,
    #[serde(rename = "drink")]
    Drink,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Self::MainCourse,
        Self::SideDish,
        Self::Dessert,
        Self::Appetizer,
        Self::Salad,
        Self::Bread,
        Self::Breakfast,
        Self::Soup,
        Self::Beverage,
        Self::Sauce,
        Self::Marinade,
        Self::Fingerfood,
        Self::Snack,
        Self::Drink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainCourse => "main course",
            Self::SideDish => "side dish",
            Self::Dessert => "dessert",
            Self::Appetizer => "appetizer",
            Self::Salad => "salad",
            Self::Bread => "bread",
            Self::Breakfast => "breakfast",
            Self::Soup => "soup",
            Self::Beverage => "beverage",
            Self::Sauce => "sauce",
            Self::Marinade => "marinade",
            Self::Fingerfood => "fingerfood",
            Self::Snack => "snack",
            Self::Drink => "drink",
        }
    }

    /// Map a free-text dish type from the provider onto a known category.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        Self::ALL.iter().copied().find(|c| c.as_str() == label)
    }
}

/// Dietary label attached to a recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Diet {
    Vegan,
    Carnivore,
    GlutenFree,
    Vegetarian,
    DairyFree,
}

impl Diet {
    pub const ALL: &'static [Diet] = &[
        Self::Vegan,
        Self::Carnivore,
        Self::GlutenFree,
        Self::Vegetarian,
        Self::DairyFree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vegan => "vegan",
            Self::Carnivore => "carnivore",
            Self::GlutenFree => "gluten_free",
            Self::Vegetarian => "vegetarian",
            Self::DairyFree => "dairy_free",
        }
    }

    /// Map a provider diet label (`"Gluten-Free"`, `"dairy free"`) onto a known diet.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL.iter().copied().find(|d| d.as_str() == label)
    }
}

macro_rules! label_impls {
    ($ty:ident, $name:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseLabelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_label(s).ok_or_else(|| ParseLabelError {
                    kind: $name,
                    invalid: s.to_string(),
                    valid: Self::ALL.iter().map(|v| v.as_str()).collect(),
                })
            }
        }
    };
}

label_impls!(Category, "category");
label_impls!(Diet, "diet");

/// Error when parsing an unknown category or diet label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLabelError {
    kind: &'static str,
    invalid: String,
    valid: Vec<&'static str>,
}

impl fmt::Display for ParseLabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid {} '{}'. Valid values: {}",
            self.kind,
            self.invalid,
            self.valid.join(", ")
        )
    }
}

impl std::error::Error for ParseLabelError {}

/// Map provider labels onto a sorted, de-duplicated label set.
///
/// Unknown labels are dropped, so an input without any recognised label yields
/// an empty set.
pub fn label_set<T, F>(labels: &[String], parse: F) -> Vec<T>
where
    T: Ord + Copy,
    F: Fn(&str) -> Option<T>,
{
    let mut set: Vec<T> = labels.iter().filter_map(|l| parse(l)).collect();
    set.sort();
    set.dedup();
    set
}

/// Convert a label set into the JSON array stored in the database.
pub fn labels_to_json<T: fmt::Display>(labels: &[T]) -> serde_json::Value {
    serde_json::Value::Array(
        labels
            .iter()
            .map(|l| serde_json::Value::String(l.to_string()))
            .collect(),
    )
}

/// Read a stored JSON label array, silently dropping entries that no longer parse.
pub fn labels_from_json<T: FromStr>(value: &serde_json::Value) -> Vec<T> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .filter_map(|s| s.parse().ok())
                .collect()
        })
        .unwrap_or_default()
}
