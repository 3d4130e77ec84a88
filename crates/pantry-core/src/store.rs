//! Shared wizard state: a snapshot, a fixed command set applied by a pure
//! transition function, and an owning [`Store`] that persists favorites and
//! notifies subscribers.

use serde::{Deserialize, Serialize};

use crate::storage::Persistence;
use crate::{
    CaloriePreference, DietType, FavoriteRecipe, Recipe, RecipeInput, ServingSize,
};

pub const DEFAULT_CUSTOM_CALORIES: u32 = 500;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadingState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl LoadingState {
    /// Generation status machine: `idle -> loading -> {success | error}`.
    /// A new attempt may start from any phase; `error -> idle` is an explicit clear.
    pub fn can_transition_to(self, next: LoadingState) -> bool {
        use LoadingState::*;
        matches!(
            (self, next),
            (_, Loading) | (Loading, Success) | (Loading, Error) | (Error, Idle)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub ingredients: Vec<String>,
    pub diet_type: DietType,
    pub calorie_preference: CaloriePreference,
    pub custom_calories: u32,
    pub serving_size: ServingSize,
    pub current_recipe: Option<Recipe>,
    pub favorites: Vec<FavoriteRecipe>,
    pub loading_state: LoadingState,
    pub error: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            ingredients: Vec::new(),
            diet_type: DietType::Vegetarian,
            calorie_preference: CaloriePreference::Medium,
            custom_calories: DEFAULT_CUSTOM_CALORIES,
            serving_size: ServingSize::Two,
            current_recipe: None,
            favorites: Vec::new(),
            loading_state: LoadingState::Idle,
            error: None,
        }
    }
}

impl AppState {
    /// Snapshot of the wizard input, ready for the generator.
    pub fn recipe_input(&self) -> RecipeInput {
        RecipeInput {
            ingredients: self.ingredients.clone(),
            diet_type: self.diet_type,
            calorie_preference: self.calorie_preference,
            custom_calories: (self.custom_calories > 0).then_some(self.custom_calories),
            serving_size: self.serving_size,
        }
    }

    pub fn is_favorite(&self, recipe_id: &str) -> bool {
        self.favorites.iter().any(|f| f.id() == recipe_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetIngredients(Vec<String>),
    AddIngredient(String),
    RemoveIngredient(String),
    SetDietType(DietType),
    SetCaloriePreference(CaloriePreference),
    SetCustomCalories(u32),
    SetServingSize(ServingSize),
    SetCurrentRecipe(Recipe),
    ClearCurrentRecipe,
    /// Replace favorites wholesale; used when hydrating from storage.
    SetFavorites(Vec<FavoriteRecipe>),
    AddFavorite { recipe: Recipe, saved_at: i64 },
    RemoveFavorite(String),
    SetLoading(LoadingState),
    SetError(Option<String>),
    ClearError,
    BeginGeneration,
    GenerationSucceeded(Recipe),
    GenerationFailed(String),
    ResetInput,
}

fn normalize_ingredient(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

fn set_loading(state: &mut AppState, next: LoadingState) -> bool {
    if !state.loading_state.can_transition_to(next) {
        tracing::warn!(
            from = ?state.loading_state,
            to = ?next,
            "ignoring invalid loading transition"
        );
        return false;
    }
    state.loading_state = next;
    if next == LoadingState::Loading {
        state.error = None;
    }
    true
}

/// Apply one command to a state snapshot.
pub fn reduce(state: &AppState, command: Command) -> AppState {
    let mut next = state.clone();
    match command {
        Command::SetIngredients(list) => {
            let mut ingredients: Vec<String> = Vec::with_capacity(list.len());
            for item in list.iter().filter_map(|s| normalize_ingredient(s)) {
                if !ingredients.contains(&item) {
                    ingredients.push(item);
                }
            }
            next.ingredients = ingredients;
        }
        Command::AddIngredient(raw) => {
            if let Some(item) = normalize_ingredient(&raw) {
                if !next.ingredients.contains(&item) {
                    next.ingredients.push(item);
                }
            }
        }
        Command::RemoveIngredient(raw) => {
            let target = raw.trim().to_lowercase();
            next.ingredients.retain(|i| i.to_lowercase() != target);
        }
        Command::SetDietType(diet) => next.diet_type = diet,
        Command::SetCaloriePreference(pref) => next.calorie_preference = pref,
        Command::SetCustomCalories(calories) => next.custom_calories = calories,
        Command::SetServingSize(size) => next.serving_size = size,
        Command::SetCurrentRecipe(recipe) => next.current_recipe = Some(recipe),
        Command::ClearCurrentRecipe => next.current_recipe = None,
        Command::SetFavorites(favorites) => next.favorites = favorites,
        Command::AddFavorite { recipe, saved_at } => {
            if !next.is_favorite(&recipe.id) {
                next.favorites.insert(0, FavoriteRecipe::new(recipe, saved_at));
            }
        }
        Command::RemoveFavorite(id) => next.favorites.retain(|f| f.id() != id),
        Command::SetLoading(phase) => {
            set_loading(&mut next, phase);
        }
        Command::SetError(message) => next.error = message,
        Command::ClearError => next.error = None,
        Command::BeginGeneration => {
            set_loading(&mut next, LoadingState::Loading);
        }
        Command::GenerationSucceeded(recipe) => {
            if set_loading(&mut next, LoadingState::Success) {
                next.current_recipe = Some(recipe);
            }
        }
        Command::GenerationFailed(message) => {
            if set_loading(&mut next, LoadingState::Error) {
                next.error = Some(message);
            }
        }
        Command::ResetInput => {
            let defaults = AppState::default();
            next.ingredients = defaults.ingredients;
            next.diet_type = defaults.diet_type;
            next.calorie_preference = defaults.calorie_preference;
            next.custom_calories = defaults.custom_calories;
            next.serving_size = defaults.serving_size;
            next.error = None;
            next.loading_state = LoadingState::Idle;
        }
    }
    next
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&AppState)>;

/// Owns the session's state. Constructed once per session and passed to
/// whoever needs it.
pub struct Store {
    state: AppState,
    persistence: Persistence,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl Store {
    /// A store with default state, not hydrated from storage.
    pub fn new(persistence: Persistence) -> Self {
        Self {
            state: AppState::default(),
            persistence,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// A store hydrated with the persisted favorites and last recipe.
    pub fn open(persistence: Persistence) -> Self {
        let favorites = persistence.load_favorites();
        let last = persistence.load_last_recipe();
        let mut store = Self::new(persistence);
        if !favorites.is_empty() {
            store.state = reduce(&store.state, Command::SetFavorites(favorites));
        }
        if let Some(recipe) = last {
            store.state = reduce(&store.state, Command::SetCurrentRecipe(recipe));
        }
        tracing::debug!(
            favorites = store.state.favorites.len(),
            has_last = store.state.current_recipe.is_some(),
            "store hydrated"
        );
        store
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn subscribe(&mut self, listener: impl Fn(&AppState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    pub fn dispatch(&mut self, command: Command) {
        tracing::trace!(?command, "dispatch");
        let next = reduce(&self.state, command);
        if next == self.state {
            return;
        }
        if next.favorites != self.state.favorites {
            self.persistence.save_favorites(&next.favorites);
        }
        self.state = next;
        for (_, listener) in &self.listeners {
            listener(&self.state);
        }
    }

    // --- Command shorthands ---

    pub fn set_ingredients(&mut self, ingredients: Vec<String>) {
        self.dispatch(Command::SetIngredients(ingredients));
    }

    pub fn add_ingredient(&mut self, ingredient: &str) {
        self.dispatch(Command::AddIngredient(ingredient.to_string()));
    }

    pub fn remove_ingredient(&mut self, ingredient: &str) {
        self.dispatch(Command::RemoveIngredient(ingredient.to_string()));
    }

    pub fn set_diet_type(&mut self, diet: DietType) {
        self.dispatch(Command::SetDietType(diet));
    }

    pub fn set_calorie_preference(&mut self, pref: CaloriePreference) {
        self.dispatch(Command::SetCaloriePreference(pref));
    }

    /// Select the custom preference with a specific per-serving value.
    pub fn set_custom_calories(&mut self, calories: u32) {
        self.dispatch(Command::SetCaloriePreference(CaloriePreference::Custom));
        self.dispatch(Command::SetCustomCalories(calories));
    }

    pub fn set_serving_size(&mut self, size: ServingSize) {
        self.dispatch(Command::SetServingSize(size));
    }

    pub fn set_current_recipe(&mut self, recipe: Recipe) {
        self.dispatch(Command::SetCurrentRecipe(recipe));
    }

    pub fn clear_current_recipe(&mut self) {
        self.dispatch(Command::ClearCurrentRecipe);
    }

    pub fn add_favorite(&mut self, recipe: Recipe) {
        self.dispatch(Command::AddFavorite {
            recipe,
            saved_at: crate::now_millis(),
        });
    }

    pub fn remove_favorite(&mut self, recipe_id: &str) {
        self.dispatch(Command::RemoveFavorite(recipe_id.to_string()));
    }

    pub fn set_loading(&mut self, phase: LoadingState) {
        self.dispatch(Command::SetLoading(phase));
    }

    pub fn clear_error(&mut self) {
        self.dispatch(Command::ClearError);
    }

    pub fn reset_input(&mut self) {
        self.dispatch(Command::ResetInput);
    }
}
