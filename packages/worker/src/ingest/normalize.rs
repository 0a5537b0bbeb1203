//! Turns raw provider payloads into the shape stored in the recipe table.

use std::collections::HashMap;
use std::sync::LazyLock;

use common::labels::{Category, Diet, label_set};
use regex::Regex;

use super::source::{ProviderNutrition, ProviderRecipe};

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid HTML tag regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));
static PERIOD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{2,}").expect("Invalid period regex"));
static NUMBERED_STEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d+)\.").expect("Invalid step marker regex"));
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("Invalid sentence regex"));

const NO_INGREDIENTS: &str = "Ingredients not available.";
const NO_INSTRUCTIONS: &str = "No instructions available.";

/// Nutrition facts per recipe; every amount is clamped to be non-negative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Nutrition {
    pub calories_kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub sugars: f64,
    pub sodium: f64,
    pub cholesterol: f64,
    pub calcium: f64,
    pub iron: f64,
    pub vitamin_c: f64,
}

/// A provider recipe ready to be upserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecipe {
    pub api_id: i32,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub categories: Vec<Category>,
    pub diets: Vec<Diet>,
    pub servings: i32,
    pub prep_time: i32,
    pub cooking_time: i32,
    pub image_url: Option<String>,
    pub nutrition: Nutrition,
}

/// Fields a provider item must carry before it is worth storing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Ingredients,
    Instructions,
    Nutrition,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingredients => "ingredients",
            Self::Instructions => "instructions",
            Self::Nutrition => "nutrition",
        }
    }
}

/// Which required fields `item` lacks. Empty means the item is complete.
pub fn missing_fields(item: &ProviderRecipe) -> Vec<MissingField> {
    let mut missing = Vec::new();
    if item.raw_ingredients().is_empty() {
        missing.push(MissingField::Ingredients);
    }
    let has_steps = item
        .analyzed_instructions
        .iter()
        .flatten()
        .any(|group| group.steps.iter().flatten().next().is_some());
    let has_text = item
        .instructions
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());
    if !has_steps && !has_text {
        missing.push(MissingField::Instructions);
    }
    if item.nutrition.is_none() {
        missing.push(MissingField::Nutrition);
    }
    missing
}

/// Strip HTML tags, collapse whitespace runs to one space and runs of periods
/// to one period.
pub fn clean_text(text: &str) -> String {
    collapse(text, "")
}

/// Like [`clean_text`], but tags become spaces so adjacent list items and
/// paragraphs stay separate words.
fn clean_block_text(text: &str) -> String {
    collapse(text, " ")
}

fn collapse(text: &str, tag_replacement: &str) -> String {
    let text = HTML_TAG.replace_all(text, tag_replacement);
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    let text = PERIOD_RUN.replace_all(&text, ".");
    text.trim().to_string()
}

/// Split free-text instructions into steps.
///
/// Uses an explicit `1. ... 2. ...` numbering when one is present, otherwise
/// falls back to sentence boundaries.
pub fn split_instructions(raw: &str) -> Vec<String> {
    let text = clean_block_text(raw);
    split_numbered(&text).unwrap_or_else(|| split_sentences(&text))
}

/// Split on step markers numbered 1, 2, 3, ... in order.
///
/// A marker is a number followed by a period and then anything but a digit,
/// so `1.Mix` counts and `1.5 cups` does not. Numbers that break the sequence
/// (`bake at 350. `) stay inside the step.
fn split_numbered(text: &str) -> Option<Vec<String>> {
    let mut markers: Vec<(usize, usize)> = Vec::new();
    let mut expected = 1u32;
    for caps in NUMBERED_STEP.captures_iter(text) {
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let ends_marker = text[whole.end()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_digit());
        if ends_marker && number.as_str().parse::<u32>().ok() == Some(expected) {
            markers.push((number.start(), whole.end()));
            expected += 1;
        }
    }
    let first = markers.first()?.0;

    let mut steps = Vec::with_capacity(markers.len() + 1);
    steps.push(&text[..first]);
    for (i, &(_, content_start)) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map_or(text.len(), |&(next, _)| next);
        steps.push(&text[content_start..end]);
    }
    Some(non_empty(steps))
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut last = 0;
    for m in SENTENCE_END.find_iter(text) {
        steps.push(&text[last..m.start() + 1]);
        last = m.end();
    }
    steps.push(&text[last..]);
    non_empty(steps)
}

fn non_empty<'a>(parts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn instruction_steps(item: &ProviderRecipe) -> Vec<String> {
    let structured: Vec<String> = item
        .analyzed_instructions
        .iter()
        .flatten()
        .flat_map(|group| group.steps.iter().flatten())
        .map(|step| clean_text(&step.step))
        .filter(|s| !s.is_empty())
        .collect();
    if !structured.is_empty() {
        return structured;
    }

    let steps = item
        .instructions
        .as_deref()
        .map(split_instructions)
        .unwrap_or_default();
    if steps.is_empty() {
        vec![NO_INSTRUCTIONS.to_string()]
    } else {
        steps
    }
}

fn ingredient_lines(item: &ProviderRecipe) -> Vec<String> {
    let lines: Vec<String> = item
        .raw_ingredients()
        .into_iter()
        .filter_map(|ing| {
            [&ing.original, &ing.name, &ing.original_string]
                .into_iter()
                .flatten()
                .map(|s| s.trim())
                .find(|s| !s.is_empty())
        })
        .map(str::to_string)
        .collect();
    if lines.is_empty() {
        vec![NO_INGREDIENTS.to_string()]
    } else {
        lines
    }
}

/// Map provider nutrients (matched by case-insensitive name) onto stored
/// columns. Absent nutrients are zero.
pub fn map_nutrition(nutrition: &ProviderNutrition) -> Nutrition {
    let amounts: HashMap<String, f64> = nutrition
        .nutrients
        .iter()
        .flatten()
        .map(|n| (n.name.trim().to_lowercase(), n.amount))
        .collect();
    let get = |name: &str| amounts.get(name).copied().map_or(0.0, non_negative);

    Nutrition {
        calories_kcal: get("calories"),
        protein: get("protein"),
        fat: get("fat"),
        carbs: get("carbohydrates"),
        fiber: get("fiber"),
        sugars: get("sugar"),
        sodium: get("sodium"),
        cholesterol: get("cholesterol"),
        calcium: get("calcium"),
        iron: get("iron"),
        vitamin_c: get("vitamin c"),
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

/// Normalize a complete provider item. Returns `None` when the item has no
/// usable identifier.
pub fn normalize(item: &ProviderRecipe) -> Option<NormalizedRecipe> {
    let api_id = i32::try_from(item.id).ok()?;
    let title = item
        .title
        .as_deref()
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Recipe {api_id}"));

    Some(NormalizedRecipe {
        api_id,
        title,
        description: item.summary.as_deref().map(clean_text).unwrap_or_default(),
        ingredients: ingredient_lines(item),
        instructions: instruction_steps(item),
        categories: label_set(item.dish_types.as_deref().unwrap_or_default(), Category::from_label),
        diets: label_set(item.diets.as_deref().unwrap_or_default(), Diet::from_label),
        servings: item.servings.unwrap_or(0).max(0),
        prep_time: item.preparation_minutes.unwrap_or(0).max(0),
        cooking_time: item.ready_in_minutes.unwrap_or(0).max(0),
        image_url: item.image.clone().filter(|s| !s.trim().is_empty()),
        nutrition: item.nutrition.as_ref().map(map_nutrition).unwrap_or_default(),
    })
}
