//! Spoonacular recipe search client and the provider payload types.

use std::time::Duration;

use async_trait::async_trait;
use common::config::IngestConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP 402: the provider account has no calls left.
    #[error("Provider quota exhausted (HTTP 402)")]
    QuotaExhausted,

    #[error("Provider returned HTTP {status}")]
    Http { status: u16 },

    /// Connection failure, timeout or undecodable body.
    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the API key.
        SourceError::Network(e.without_url().to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderIngredient {
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_string: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProviderStep {
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub step: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProviderInstructionGroup {
    #[serde(default)]
    pub steps: Option<Vec<ProviderStep>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProviderNutrient {
    pub name: String,
    #[serde(default)]
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProviderNutrition {
    #[serde(default)]
    pub nutrients: Option<Vec<ProviderNutrient>>,
}

/// One `results[]` entry of `complexSearch`, or a `/information` body.
///
/// The provider sends `null` for absent lists, so every collection is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecipe {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub servings: Option<i32>,
    #[serde(default)]
    pub ready_in_minutes: Option<i32>,
    #[serde(default)]
    pub preparation_minutes: Option<i32>,
    #[serde(default)]
    pub dish_types: Option<Vec<String>>,
    #[serde(default)]
    pub diets: Option<Vec<String>>,
    #[serde(default)]
    pub extended_ingredients: Option<Vec<ProviderIngredient>>,
    #[serde(default)]
    pub used_ingredients: Option<Vec<ProviderIngredient>>,
    #[serde(default)]
    pub missed_ingredients: Option<Vec<ProviderIngredient>>,
    #[serde(default)]
    pub analyzed_instructions: Option<Vec<ProviderInstructionGroup>>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub nutrition: Option<ProviderNutrition>,
}

impl ProviderRecipe {
    /// `extendedIngredients`, or `usedIngredients` + `missedIngredients` when
    /// the former is absent or empty.
    pub fn raw_ingredients(&self) -> Vec<&ProviderIngredient> {
        let extended: Vec<&ProviderIngredient> =
            self.extended_ingredients.iter().flatten().collect();
        if !extended.is_empty() {
            return extended;
        }
        self.used_ingredients
            .iter()
            .flatten()
            .chain(self.missed_ingredients.iter().flatten())
            .collect()
    }

    /// Fill every absent field from a detail payload of the same recipe.
    pub fn fill_from(&mut self, detail: ProviderRecipe) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>, empty: impl Fn(&T) -> bool) {
            if slot.as_ref().is_none_or(&empty) && value.as_ref().is_some_and(|v| !empty(v)) {
                *slot = value;
            }
        }
        fill(&mut self.title, detail.title, |s: &String| s.trim().is_empty());
        fill(&mut self.summary, detail.summary, |s: &String| s.trim().is_empty());
        fill(&mut self.image, detail.image, |s: &String| s.trim().is_empty());
        fill(&mut self.servings, detail.servings, |_| false);
        fill(&mut self.ready_in_minutes, detail.ready_in_minutes, |_| false);
        fill(&mut self.preparation_minutes, detail.preparation_minutes, |_| false);
        fill(&mut self.dish_types, detail.dish_types, Vec::is_empty);
        fill(&mut self.diets, detail.diets, Vec::is_empty);
        fill(&mut self.extended_ingredients, detail.extended_ingredients, Vec::is_empty);
        fill(&mut self.analyzed_instructions, detail.analyzed_instructions, Vec::is_empty);
        fill(&mut self.instructions, detail.instructions, |s: &String| s.trim().is_empty());
        fill(&mut self.nutrition, detail.nutrition, |_| false);
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub recipes: Vec<ProviderRecipe>,
    /// Entries that could not be decoded and were dropped.
    pub malformed: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<serde_json::Value>>,
}

/// Upstream recipe catalogue.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// Fetch `number` recipes starting at `offset`, with nutrition and full
    /// recipe information.
    async fn search(&self, offset: u32, number: u32) -> Result<SearchPage, SourceError>;

    /// Fetch the full record of one recipe, nutrition included.
    async fn information(&self, id: i64) -> Result<ProviderRecipe, SourceError>;
}

/// `RecipeSource` backed by the Spoonacular REST API.
pub struct SpoonacularClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SpoonacularClient {
    pub fn new(config: &IngestConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        match resp.status() {
            StatusCode::PAYMENT_REQUIRED => Err(SourceError::QuotaExhausted),
            status if !status.is_success() => Err(SourceError::Http {
                status: status.as_u16(),
            }),
            _ => Ok(resp),
        }
    }
}

#[async_trait]
impl RecipeSource for SpoonacularClient {
    async fn search(&self, offset: u32, number: u32) -> Result<SearchPage, SourceError> {
        let query = [
            ("offset", offset.to_string()),
            ("number", number.to_string()),
            ("addRecipeNutrition", "true".to_string()),
            ("addRecipeInformation", "true".to_string()),
            ("fillIngredients", "true".to_string()),
            ("sort", "random".to_string()),
        ];
        let body: SearchResponse = self.get("/recipes/complexSearch", &query).await?.json().await?;

        let mut page = SearchPage::default();
        for value in body.results.unwrap_or_default() {
            match serde_json::from_value::<ProviderRecipe>(value) {
                Ok(recipe) => page.recipes.push(recipe),
                Err(e) => {
                    warn!(error = %e, "Dropping undecodable search result");
                    page.malformed += 1;
                }
            }
        }
        debug!(offset, received = page.recipes.len(), "Fetched search page");
        Ok(page)
    }

    async fn information(&self, id: i64) -> Result<ProviderRecipe, SourceError> {
        let path = format!("/recipes/{id}/information");
        let query = [("includeNutrition", "true".to_string())];
        Ok(self.get(&path, &query).await?.json().await?)
    }
}
