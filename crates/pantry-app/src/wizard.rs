//! Step sequencing for the recipe wizard.
//!
//! The wizard owns nothing but its position; all input lives in the
//! [`Store`] it is handed.

use thiserror::Error;

use pantry_core::share::validate_ingredients;
use pantry_core::store::{AppState, Command, LoadingState, Store};
use pantry_core::Recipe;
use pantry_generate::{ChatTransport, GenerationError, RecipeGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Ingredients,
    Diet,
    Calories,
    Servings,
    Generate,
    Result,
}

impl WizardStep {
    /// Number of input-collection steps shown in the progress indicator.
    pub const INPUT_STEPS: usize = 4;

    /// Position among the input steps, if this is one of them.
    pub fn progress(self) -> Option<(usize, usize)> {
        let index = match self {
            WizardStep::Ingredients => 0,
            WizardStep::Diet => 1,
            WizardStep::Calories => 2,
            WizardStep::Servings => 3,
            WizardStep::Generate | WizardStep::Result => return None,
        };
        Some((index, Self::INPUT_STEPS))
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::Ingredients => "Add Ingredients",
            WizardStep::Diet => "Diet Preference",
            WizardStep::Calories => "Calorie Preference",
            WizardStep::Servings => "Serving Size",
            WizardStep::Generate => "Creating your recipe",
            WizardStep::Result => "Your Recipe",
        }
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Add at least one ingredient (two letters or more) before continuing.")]
    NoIngredients,
    #[error("There is no recipe yet. Start by adding your ingredients.")]
    NoRecipe,
    #[error("cannot {action} from the {step:?} step")]
    WrongStep {
        action: &'static str,
        step: WizardStep,
    },
    #[error("a recipe is already being generated for this visit")]
    AlreadyStarted,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    generation_started: bool,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Ingredients,
            generation_started: false,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn can_proceed(&self, state: &AppState) -> bool {
        match self.step {
            WizardStep::Ingredients => validate_ingredients(&state.ingredients),
            WizardStep::Diet | WizardStep::Calories | WizardStep::Servings => true,
            WizardStep::Generate | WizardStep::Result => false,
        }
    }

    /// Move to the next input step. Entering Generate arms a single generation.
    pub fn advance(&mut self, state: &AppState) -> Result<WizardStep, FlowError> {
        let next = match self.step {
            WizardStep::Ingredients if !validate_ingredients(&state.ingredients) => {
                return Err(FlowError::NoIngredients)
            }
            WizardStep::Ingredients => WizardStep::Diet,
            WizardStep::Diet => WizardStep::Calories,
            WizardStep::Calories => WizardStep::Servings,
            WizardStep::Servings => WizardStep::Generate,
            step @ (WizardStep::Generate | WizardStep::Result) => {
                return Err(FlowError::WrongStep {
                    action: "advance",
                    step,
                })
            }
        };
        if next == WizardStep::Generate {
            self.generation_started = false;
        }
        tracing::debug!(from = ?self.step, to = ?next, "wizard advanced");
        self.step = next;
        Ok(next)
    }

    /// Walk the remaining input steps with their current values, stopping at
    /// Generate. Fails on the first step that cannot be left.
    pub fn advance_to_generate(&mut self, state: &AppState) -> Result<(), FlowError> {
        while self.step != WizardStep::Generate {
            self.advance(state)?;
        }
        Ok(())
    }

    pub fn back(&mut self) -> WizardStep {
        self.step = match self.step {
            WizardStep::Ingredients | WizardStep::Diet => WizardStep::Ingredients,
            WizardStep::Calories => WizardStep::Diet,
            WizardStep::Servings => WizardStep::Calories,
            WizardStep::Generate | WizardStep::Result => WizardStep::Servings,
        };
        self.step
    }

    /// Leave a failed generation and return to the first step, input intact.
    pub fn back_to_ingredients(&mut self, store: &mut Store) {
        store.clear_error();
        if store.state().loading_state == LoadingState::Error {
            store.set_loading(LoadingState::Idle);
        }
        self.generation_started = false;
        self.step = WizardStep::Ingredients;
    }

    /// Re-enter the generation step from scratch. Any earlier attempt is abandoned.
    pub fn retry(&mut self) -> Result<(), FlowError> {
        if self.step != WizardStep::Generate {
            return Err(FlowError::WrongStep {
                action: "retry",
                step: self.step,
            });
        }
        self.generation_started = false;
        Ok(())
    }

    /// Jump straight to the result view for the store's current recipe.
    pub fn show_current(&mut self, state: &AppState) -> Result<(), FlowError> {
        if state.current_recipe.is_none() {
            return Err(FlowError::NoRecipe);
        }
        self.step = WizardStep::Result;
        Ok(())
    }

    /// Reset all input and go back to the first step.
    pub fn start_over(&mut self, store: &mut Store) {
        store.reset_input();
        self.generation_started = false;
        self.step = WizardStep::Ingredients;
    }

    /// Run the generation pipeline once for this visit to the Generate step.
    pub async fn generate<T: ChatTransport>(
        &mut self,
        store: &mut Store,
        generator: &RecipeGenerator<T>,
    ) -> Result<Recipe, FlowError> {
        if self.step != WizardStep::Generate {
            return Err(FlowError::WrongStep {
                action: "generate",
                step: self.step,
            });
        }
        if self.generation_started {
            return Err(FlowError::AlreadyStarted);
        }
        self.generation_started = true;

        store.dispatch(Command::BeginGeneration);
        let input = store.state().recipe_input();

        match generator.generate(&input).await {
            Ok(recipe) => {
                store.persistence().save_last_recipe(&recipe);
                store.dispatch(Command::GenerationSucceeded(recipe.clone()));
                self.step = WizardStep::Result;
                Ok(recipe)
            }
            Err(e) => {
                store.dispatch(Command::GenerationFailed(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Add or remove the current recipe from favorites. Returns whether it is
    /// a favorite afterwards.
    pub fn toggle_favorite(&self, store: &mut Store) -> Result<bool, FlowError> {
        let recipe = store
            .state()
            .current_recipe
            .clone()
            .ok_or(FlowError::NoRecipe)?;
        if store.state().is_favorite(&recipe.id) {
            store.remove_favorite(&recipe.id);
            Ok(false)
        } else {
            store.add_favorite(recipe);
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry_core::storage::Persistence;

    #[test]
    fn ingredients_gate_the_first_step() {
        let mut store = Store::new(Persistence::in_memory());
        let mut wizard = Wizard::new();

        assert!(!wizard.can_proceed(store.state()));
        assert!(matches!(
            wizard.advance(store.state()),
            Err(FlowError::NoIngredients)
        ));

        store.add_ingredient("x");
        assert!(!wizard.can_proceed(store.state()));
        assert!(matches!(
            wizard.advance(store.state()),
            Err(FlowError::NoIngredients)
        ));

        store.add_ingredient("okra");
        assert!(wizard.can_proceed(store.state()));
        assert_eq!(wizard.advance(store.state()).unwrap(), WizardStep::Diet);
    }

    #[test]
    fn steps_run_in_order_and_back_retraces_them() {
        let mut store = Store::new(Persistence::in_memory());
        store.add_ingredient("rice");
        let mut wizard = Wizard::new();

        let mut seen = vec![wizard.step()];
        while wizard.step() != WizardStep::Generate {
            seen.push(wizard.advance(store.state()).unwrap());
        }
        assert_eq!(
            seen,
            vec![
                WizardStep::Ingredients,
                WizardStep::Diet,
                WizardStep::Calories,
                WizardStep::Servings,
                WizardStep::Generate,
            ]
        );
        assert!(wizard.advance(store.state()).is_err());

        assert_eq!(wizard.back(), WizardStep::Servings);
        assert_eq!(wizard.back(), WizardStep::Calories);
        assert_eq!(wizard.step().progress(), Some((2, 4)));
    }

    #[test]
    fn one_shot_advance_reports_missing_ingredients() {
        let mut store = Store::new(Persistence::in_memory());
        store.set_ingredients(vec![",".to_string(), " ".to_string()]);
        let mut wizard = Wizard::new();

        assert!(matches!(
            wizard.advance_to_generate(store.state()),
            Err(FlowError::NoIngredients)
        ));
        assert_eq!(wizard.step(), WizardStep::Ingredients);

        store.set_ingredients(vec!["paneer".to_string()]);
        wizard.advance_to_generate(store.state()).unwrap();
        assert_eq!(wizard.step(), WizardStep::Generate);
    }

    #[test]
    fn start_over_resets_input() {
        let mut store = Store::new(Persistence::in_memory());
        store.add_ingredient("rice");
        let mut wizard = Wizard::new();
        wizard.advance(store.state()).unwrap();

        wizard.start_over(&mut store);

        assert_eq!(wizard.step(), WizardStep::Ingredients);
        assert!(store.state().ingredients.is_empty());
    }

    #[test]
    fn result_needs_a_recipe() {
        let store = Store::new(Persistence::in_memory());
        let mut wizard = Wizard::new();
        assert!(matches!(
            wizard.show_current(store.state()),
            Err(FlowError::NoRecipe)
        ));
        assert!(matches!(
            wizard.toggle_favorite(&mut Store::new(Persistence::in_memory())),
            Err(FlowError::NoRecipe)
        ));
    }
}
