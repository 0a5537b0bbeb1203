//! Scripted stand-ins for the provider, the recipe table and the queue.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{DlqEnvelope, IngestJob};
use mq::MqError;

use super::normalize::NormalizedRecipe;
use super::scheduler::JobScheduler;
use super::source::{ProviderRecipe, RecipeSource, SearchPage, SourceError};
use super::store::{RecipeStore, StoreError, UpsertOutcome};

/// Replays queued search responses; an exhausted script yields empty pages.
#[derive(Default)]
pub struct FakeRecipeSource {
    pages: Mutex<VecDeque<Result<SearchPage, SourceError>>>,
    details: Mutex<HashMap<i64, Result<ProviderRecipe, SourceError>>>,
    search_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

impl FakeRecipeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, recipes: Vec<serde_json::Value>) {
        let recipes = recipes
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect();
        self.pages.lock().unwrap().push_back(Ok(SearchPage {
            recipes,
            malformed: 0,
        }));
    }

    pub fn push_error(&self, error: SourceError) {
        self.pages.lock().unwrap().push_back(Err(error));
    }

    pub fn set_detail(&self, id: i64, detail: serde_json::Value) {
        self.details
            .lock()
            .unwrap()
            .insert(id, Ok(serde_json::from_value(detail).unwrap()));
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeSource for FakeRecipeSource {
    async fn search(&self, _offset: u32, _number: u32) -> Result<SearchPage, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SearchPage::default()))
    }

    async fn information(&self, id: i64) -> Result<ProviderRecipe, SourceError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.details
            .lock()
            .unwrap()
            .remove(&id)
            .unwrap_or(Err(SourceError::Http { status: 404 }))
    }
}

#[derive(Debug, Clone)]
struct StoredRecipe {
    id: i32,
    slug: String,
    recipe: NormalizedRecipe,
}

/// In-process store with the same keying and slug rules as the database.
#[derive(Debug, Default)]
pub struct MemoryRecipeStore {
    recipes: tokio::sync::Mutex<HashMap<i32, StoredRecipe>>,
    failing: tokio::sync::Mutex<HashSet<i32>>,
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upsert of `api_id` fail.
    pub async fn fail_on(&self, api_id: i32) {
        self.failing.lock().await.insert(api_id);
    }

    pub async fn len(&self) -> usize {
        self.recipes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, api_id: i32) -> Option<NormalizedRecipe> {
        self.recipes
            .lock()
            .await
            .get(&api_id)
            .map(|s| s.recipe.clone())
    }

    pub async fn slug(&self, api_id: i32) -> Option<String> {
        self.recipes
            .lock()
            .await
            .get(&api_id)
            .map(|s| s.slug.clone())
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn upsert(&self, r: &NormalizedRecipe) -> Result<UpsertOutcome, StoreError> {
        if self.failing.lock().await.contains(&r.api_id) {
            return Err(StoreError(format!("write rejected for api_id {}", r.api_id)));
        }

        let mut recipes = self.recipes.lock().await;
        if let Some(stored) = recipes.get_mut(&r.api_id) {
            stored.recipe = r.clone();
            return Ok(UpsertOutcome::Updated { id: stored.id });
        }

        let base = common::slug::slugify(&r.title);
        let taken: Vec<String> = recipes.values().map(|s| s.slug.clone()).collect();
        let slug = common::slug::resolve_collision(&base, &taken);
        let id = recipes.len() as i32 + 1;
        recipes.insert(
            r.api_id,
            StoredRecipe {
                id,
                slug: slug.clone(),
                recipe: r.clone(),
            },
        );
        Ok(UpsertOutcome::Created { id, slug })
    }
}

/// Records every scheduled job and dead letter instead of publishing.
#[derive(Default)]
pub struct RecordingScheduler {
    pub scheduled: Mutex<Vec<(IngestJob, Duration)>>,
    pub dead_letters: Mutex<Vec<DlqEnvelope>>,
    fail: AtomicBool,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let scheduler = Self::default();
        scheduler.fail.store(true, Ordering::SeqCst);
        scheduler
    }

    pub fn scheduled(&self) -> Vec<(IngestJob, Duration)> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn dead_letters(&self) -> Vec<DlqEnvelope> {
        self.dead_letters.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), MqError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(MqError::Internal("broker unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl JobScheduler for RecordingScheduler {
    async fn schedule(&self, job: &IngestJob, delay: Duration) -> Result<(), MqError> {
        self.check()?;
        self.scheduled.lock().unwrap().push((job.clone(), delay));
        Ok(())
    }

    async fn dead_letter(&self, envelope: &DlqEnvelope) -> Result<(), MqError> {
        self.check()?;
        self.dead_letters.lock().unwrap().push(envelope.clone());
        Ok(())
    }
}

/// A search result that passes every completeness check.
pub fn complete_recipe(id: i64, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "summary": "<p>Good.</p>",
        "dishTypes": ["dessert"],
        "diets": ["vegetarian"],
        "readyInMinutes": 30,
        "servings": 4,
        "extendedIngredients": [{"original": "1 cup sugar"}],
        "analyzedInstructions": [{"steps": [{"number": 1, "step": "Bake."}]}],
        "nutrition": {"nutrients": [{"name": "Calories", "amount": 250.0}]}
    })
}
