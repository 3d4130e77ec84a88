//! Line-oriented terminal front end for the wizard.

use std::cell::Cell;
use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::Result;

use pantry_core::share::{format_amount, format_date, parse_ingredients, total_nutrition};
use pantry_core::store::{LoadingState, Store, SubscriptionId};
use pantry_core::{CaloriePreference, DietType, FavoriteRecipe, Recipe, ServingSize};
use pantry_generate::{ChatTransport, RecipeGenerator};

use crate::wizard::{FlowError, Wizard, WizardStep};

/// A calorie answer: a preset band, or a custom per-serving number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalorieChoice {
    pub preference: CaloriePreference,
    pub custom: Option<u32>,
}

impl FromStr for CalorieChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(value) = s.parse::<u32>() {
            if value == 0 {
                return Err("custom calories must be positive".to_string());
            }
            return Ok(CalorieChoice {
                preference: CaloriePreference::Custom,
                custom: Some(value),
            });
        }
        let preference: CaloriePreference = s.parse()?;
        Ok(CalorieChoice {
            preference,
            custom: None,
        })
    }
}

impl CalorieChoice {
    pub fn apply(self, store: &mut Store) {
        match self.custom {
            Some(value) => store.set_custom_calories(value),
            None => store.set_calorie_preference(self.preference),
        }
    }
}

/// Full detail view of a recipe.
pub fn render_recipe(recipe: &Recipe, favorite: bool) -> String {
    let mut out = String::with_capacity(1024);
    let star = if favorite { " ★" } else { "" };

    out.push_str(&format!("== {}{} ==\n", recipe.name, star));
    out.push_str(&recipe.description);
    out.push_str("\n\n");
    out.push_str(&format!(
        "{} | Prep {} | Cook {} | Serves {} | {}\n\n",
        recipe.diet_type.label(),
        recipe.prep_time,
        recipe.cook_time,
        recipe.servings,
        recipe.difficulty
    ));

    let n = &recipe.nutrition;
    out.push_str(&format!(
        "Nutrition (per serving): {} kcal, {}g protein, {}g carbs, {}g fats\n",
        format_amount(n.calories),
        format_amount(n.protein),
        format_amount(n.carbs),
        format_amount(n.fats)
    ));
    if recipe.servings > 1 {
        let total = total_nutrition(n, recipe.servings);
        out.push_str(&format!(
            "Whole dish ({} servings): {} kcal, {}g protein, {}g carbs, {}g fats\n",
            recipe.servings,
            format_amount(total.calories),
            format_amount(total.protein),
            format_amount(total.carbs),
            format_amount(total.fats)
        ));
    }
    out.push('\n');

    out.push_str("Ingredients:\n");
    for ingredient in &recipe.ingredients {
        out.push_str(&format!("  • {ingredient}\n"));
    }
    out.push_str("\nInstructions:\n");
    for (i, step) in recipe.instructions.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, step));
    }
    if !recipe.tags.is_empty() {
        out.push_str(&format!("\nTags: {}\n", recipe.tags.join(", ")));
    }
    out
}

pub fn render_favorites(favorites: &[FavoriteRecipe]) -> String {
    if favorites.is_empty() {
        return "No favorites yet.\n".to_string();
    }
    favorites
        .iter()
        .map(|f| {
            format!(
                "{}  {}  (saved {})\n",
                f.id(),
                f.recipe.name,
                format_date(f.saved_at)
            )
        })
        .collect()
}

/// Print generation status changes as the store reports them.
pub fn attach_status_view(store: &mut Store) -> SubscriptionId {
    let last = Cell::new(store.state().loading_state);
    store.subscribe(move |state| {
        if state.loading_state == last.get() {
            return;
        }
        last.set(state.loading_state);
        match state.loading_state {
            LoadingState::Loading => {
                eprintln!("⏳ Creating your recipe... our AI chef is analyzing your ingredients")
            }
            LoadingState::Success => eprintln!("✅ Recipe ready!"),
            LoadingState::Error => eprintln!("⚠️  Oops! Something went wrong"),
            LoadingState::Idle => {}
        }
    })
}

pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    /// Ask a question; `None` on end of input.
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{question} ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn header(&mut self, step: WizardStep) -> Result<()> {
        match step.progress() {
            Some((index, total)) => {
                self.say(&format!("\n[{}/{}] {}", index + 1, total, step.title()))
            }
            None => self.say(&format!("\n{}", step.title())),
        }
    }

    /// Drive the wizard until the user quits or input runs out.
    pub async fn run_wizard<T: ChatTransport>(
        &mut self,
        store: &mut Store,
        generator: &RecipeGenerator<T>,
        wizard: &mut Wizard,
    ) -> Result<()> {
        loop {
            let step = wizard.step();
            self.header(step)?;
            let keep_going = match step {
                WizardStep::Ingredients => self.ingredients_step(store, wizard)?,
                WizardStep::Diet => self.diet_step(store, wizard)?,
                WizardStep::Calories => self.calories_step(store, wizard)?,
                WizardStep::Servings => self.servings_step(store, wizard)?,
                WizardStep::Generate => self.generate_step(store, generator, wizard).await?,
                WizardStep::Result => self.result_step(store, wizard)?,
            };
            if !keep_going {
                return Ok(());
            }
        }
    }

    fn ingredients_step(&mut self, store: &mut Store, wizard: &mut Wizard) -> Result<bool> {
        let current = &store.state().ingredients;
        if current.is_empty() {
            self.say("What's in your kitchen? Add ingredients separated by commas.")?;
        } else {
            let count = current.len();
            let plural = if count == 1 { "" } else { "s" };
            self.say(&format!("{count} ingredient{plural} added: {}", current.join(", ")))?;
        }
        let prompt = "Add (or -name to remove, empty to continue, q to quit):";
        let Some(answer) = self.ask(prompt)? else {
            return Ok(false);
        };
        match answer.as_str() {
            "q" => return Ok(false),
            "" => {
                if let Err(e) = wizard.advance(store.state()) {
                    self.say(&e.to_string())?;
                }
            }
            removal if removal.starts_with('-') => store.remove_ingredient(&removal[1..]),
            text => {
                for ingredient in parse_ingredients(text) {
                    store.add_ingredient(&ingredient);
                }
            }
        }
        Ok(true)
    }

    fn diet_step(&mut self, store: &mut Store, wizard: &mut Wizard) -> Result<bool> {
        let current = store.state().diet_type;
        for (i, diet) in DietType::ALL.iter().enumerate() {
            let marker = if *diet == current { "*" } else { " " };
            self.say(&format!(" {marker} {}. {}", i + 1, diet.label()))?;
        }
        let prompt = "Choose a diet (number or name, empty keeps current, b back):";
        let Some(answer) = self.ask(prompt)? else {
            return Ok(false);
        };
        match answer.as_str() {
            "q" => return Ok(false),
            "b" => {
                wizard.back();
                return Ok(true);
            }
            "" => {}
            choice => match pick(choice, &DietType::ALL) {
                Some(diet) => store.set_diet_type(diet),
                None => {
                    self.say(&format!("Unknown diet: {choice}"))?;
                    return Ok(true);
                }
            },
        }
        wizard.advance(store.state())?;
        Ok(true)
    }

    fn calories_step(&mut self, store: &mut Store, wizard: &mut Wizard) -> Result<bool> {
        let state = store.state();
        let current = match state.calorie_preference {
            CaloriePreference::Custom => format!("custom ({} calories)", state.custom_calories),
            other => other.label().to_lowercase(),
        };
        self.say("Low 200-350 | Medium 400-550 | High 600-800 calories per serving")?;
        self.say(&format!("Current: {current}"))?;
        let prompt = "low, medium, high or a number (empty keeps current, b back):";
        let Some(answer) = self.ask(prompt)? else {
            return Ok(false);
        };
        match answer.as_str() {
            "q" => return Ok(false),
            "b" => {
                wizard.back();
                return Ok(true);
            }
            "" => {}
            text => match text.parse::<CalorieChoice>() {
                Ok(choice) => choice.apply(store),
                Err(e) => {
                    self.say(&e)?;
                    return Ok(true);
                }
            },
        }
        wizard.advance(store.state())?;
        Ok(true)
    }

    fn servings_step(&mut self, store: &mut Store, wizard: &mut Wizard) -> Result<bool> {
        let current = store.state().serving_size.count();
        let prompt = format!("How many people? 1, 2, 4 or 6 [{current}] (b back):");
        let Some(answer) = self.ask(&prompt)? else {
            return Ok(false);
        };
        match answer.as_str() {
            "q" => return Ok(false),
            "b" => {
                wizard.back();
                return Ok(true);
            }
            "" => {}
            text => match text.parse::<ServingSize>() {
                Ok(size) => store.set_serving_size(size),
                Err(e) => {
                    self.say(&e)?;
                    return Ok(true);
                }
            },
        }
        wizard.advance(store.state())?;
        Ok(true)
    }

    async fn generate_step<T: ChatTransport>(
        &mut self,
        store: &mut Store,
        generator: &RecipeGenerator<T>,
        wizard: &mut Wizard,
    ) -> Result<bool> {
        match wizard.generate(store, generator).await {
            Ok(_) => return Ok(true),
            Err(FlowError::Generation(e)) => self.say(&e.to_string())?,
            Err(e) => return Err(e.into()),
        }
        let Some(answer) = self.ask("[r]etry, [b]ack to ingredients or [q]uit:")? else {
            return Ok(false);
        };
        match answer.as_str() {
            "r" | "retry" => wizard.retry()?,
            "b" | "back" => wizard.back_to_ingredients(store),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn result_step(&mut self, store: &mut Store, wizard: &mut Wizard) -> Result<bool> {
        let Some(recipe) = store.state().current_recipe.clone() else {
            self.say(&FlowError::NoRecipe.to_string())?;
            wizard.start_over(store);
            return Ok(true);
        };
        let favorite = store.state().is_favorite(&recipe.id);
        self.say(&render_recipe(&recipe, favorite))?;

        loop {
            let Some(answer) = self.ask("[f]avorite, [s]hare, [n]ew recipe or [q]uit:")? else {
                return Ok(false);
            };
            match answer.as_str() {
                "f" => {
                    let now = wizard.toggle_favorite(store)?;
                    self.say(if now { "Saved to favorites." } else { "Removed from favorites." })?;
                }
                "s" => self.say(&pantry_core::share::format_recipe_for_share(&recipe))?,
                "n" => {
                    wizard.start_over(store);
                    return Ok(true);
                }
                "q" => return Ok(false),
                other => self.say(&format!("Unknown choice: {other}"))?,
            }
        }
    }
}

/// Match a menu answer by 1-based number or by name.
fn pick<T: Copy + FromStr>(answer: &str, options: &[T]) -> Option<T> {
    if let Ok(n) = answer.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| options.get(i)).copied();
    }
    answer.parse().ok()
}
