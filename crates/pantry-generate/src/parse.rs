//! Turn a free-form completion into a [`Recipe`].
//!
//! Extraction is a heuristic, not a grammar: a fenced code block wins, then
//! the outermost `{...}` span, then the whole text. Once a JSON object is in
//! hand every field is reconciled against a fixed default, so a parse that
//! succeeds always yields a structurally valid recipe.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use pantry_core::{Difficulty, NutritionInfo, Recipe, RecipeInput};

use crate::error::GenerationError;

const DEFAULT_NAME: &str = "Delicious Recipe";
const DEFAULT_DESCRIPTION: &str = "A tasty dish made with your ingredients";
const DEFAULT_PREP_TIME: &str = "15 minutes";
const DEFAULT_COOK_TIME: &str = "30 minutes";
const DEFAULT_CALORIES: f64 = 400.0;
const DEFAULT_PROTEIN: f64 = 20.0;
const DEFAULT_CARBS: f64 = 40.0;
const DEFAULT_FATS: f64 = 15.0;

/// Shape the model is asked to return. Only used to derive the response
/// schema for structured-output requests.
#[allow(dead_code)]
#[derive(serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecipeDraft {
    name: String,
    description: String,
    ingredients: Vec<String>,
    instructions: Vec<String>,
    nutrition: NutritionInfo,
    prep_time: String,
    cook_time: String,
    difficulty: Difficulty,
    tags: Vec<String>,
}

pub(crate) fn draft_schema() -> Value {
    let schema = schemars::schema_for!(RecipeDraft);
    serde_json::to_value(schema).unwrap_or(Value::Null)
}

fn fenced_block() -> &'static Regex {
    static FENCED: OnceLock<Regex> = OnceLock::new();
    FENCED.get_or_init(|| {
        Regex::new(r"```(?:[A-Za-z]+)?\s*([\s\S]*?)\s*```").expect("fenced block pattern is valid")
    })
}

/// Pick the part of the completion that should hold the JSON object.
pub fn extract_json_candidate(raw: &str) -> &str {
    if let Some(inner) = fenced_block().captures(raw).and_then(|c| c.get(1)) {
        return inner.as_str();
    }
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if end > start {
            return &raw[start..=end];
        }
    }
    raw
}

/// Parse a completion into a recipe. `servings`, `dietType`, `id` and
/// `createdAt` always come from `input` and the local clock.
pub fn normalize(raw: &str, input: &RecipeInput) -> Result<Recipe, GenerationError> {
    let candidate = extract_json_candidate(raw).trim();
    let value: Value =
        serde_json::from_str(candidate).map_err(|e| GenerationError::Parse(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| GenerationError::Parse("expected a JSON object".to_string()))?;

    let nutrition = obj.get("nutrition").and_then(Value::as_object);
    let nutrient = |key: &str| nutrition.and_then(|n| number(n.get(key)));

    Ok(Recipe {
        id: pantry_core::new_recipe_id(),
        name: text(obj, "name").unwrap_or_else(|| DEFAULT_NAME.to_string()),
        description: text(obj, "description").unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        ingredients: list(obj, "ingredients"),
        instructions: list(obj, "instructions"),
        nutrition: NutritionInfo {
            calories: nutrient("calories").unwrap_or(DEFAULT_CALORIES),
            protein: nutrient("protein").unwrap_or(DEFAULT_PROTEIN),
            carbs: nutrient("carbs").unwrap_or(DEFAULT_CARBS),
            fats: nutrient("fats").unwrap_or(DEFAULT_FATS),
            fiber: nutrient("fiber"),
            sugar: nutrient("sugar"),
        },
        servings: input.serving_size.count(),
        prep_time: text(obj, "prepTime").unwrap_or_else(|| DEFAULT_PREP_TIME.to_string()),
        cook_time: text(obj, "cookTime").unwrap_or_else(|| DEFAULT_COOK_TIME.to_string()),
        difficulty: obj
            .get("difficulty")
            .and_then(Value::as_str)
            .and_then(Difficulty::parse_loose)
            .unwrap_or_default(),
        diet_type: input.diet_type,
        created_at: pantry_core::now_millis(),
        image_url: None,
        tags: list(obj, "tags"),
    })
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Array items as display strings. Nulls are dropped, other non-strings are
/// rendered as compact JSON.
fn list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    let Some(items) = obj.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect()
}

/// A finite, non-negative number, or a string holding one.
fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry_core::{CaloriePreference, DietType, ServingSize};

    fn input() -> RecipeInput {
        RecipeInput {
            ingredients: vec!["rice".to_string()],
            diet_type: DietType::Eggetarian,
            calorie_preference: CaloriePreference::Medium,
            custom_calories: None,
            serving_size: ServingSize::Four,
        }
    }

    #[test]
    fn fenced_block_fills_defaults_for_missing_fields() {
        let raw = "```json\n{\"name\":\"X\",\"nutrition\":{\"calories\":300}}\n```";
        let recipe = normalize(raw, &input()).unwrap();

        assert_eq!(recipe.name, "X");
        assert_eq!(recipe.nutrition.calories, 300.0);
        assert_eq!(recipe.nutrition.protein, 20.0);
        assert_eq!(recipe.nutrition.carbs, 40.0);
        assert_eq!(recipe.nutrition.fats, 15.0);
        assert!(recipe.ingredients.is_empty());
        assert!(recipe.instructions.is_empty());
        assert_eq!(recipe.description, DEFAULT_DESCRIPTION);
        assert_eq!(recipe.prep_time, "15 minutes");
        assert_eq!(recipe.cook_time, "30 minutes");
        assert_eq!(recipe.difficulty, Difficulty::Medium);
        assert!(recipe.tags.is_empty());
    }

    #[test]
    fn text_without_braces_is_a_parse_error() {
        let err = normalize("I'm sorry, I cannot create that recipe.", &input()).unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }

    #[test]
    fn non_object_json_is_a_parse_error() {
        let err = normalize("[1, 2, 3]", &input()).unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }

    #[test]
    fn brace_span_is_cut_out_of_surrounding_prose() {
        let raw = "Here is your recipe: {\"name\": \"Pilaf\", \"difficulty\": \"hard\"} Enjoy!";
        assert_eq!(extract_json_candidate(raw), "{\"name\": \"Pilaf\", \"difficulty\": \"hard\"}");
        let recipe = normalize(raw, &input()).unwrap();
        assert_eq!(recipe.name, "Pilaf");
        assert_eq!(recipe.difficulty, Difficulty::Hard);
    }

    #[test]
    fn fenced_block_takes_priority_over_brace_span() {
        let raw = "Note {not json}\n```\n{\"name\":\"Inside\"}\n```";
        assert_eq!(extract_json_candidate(raw), "{\"name\":\"Inside\"}");
    }

    #[test]
    fn locally_owned_fields_ignore_model_output() {
        let raw = r#"{"name":"Stew","servings":12,"dietType":"non-veg","id":"evil","createdAt":1}"#;
        let recipe = normalize(raw, &input()).unwrap();

        assert_eq!(recipe.servings, 4);
        assert_eq!(recipe.diet_type, DietType::Eggetarian);
        assert_ne!(recipe.id, "evil");
        assert_ne!(recipe.created_at, 1);
    }

    #[test]
    fn nutrition_defaults_apply_per_field() {
        let raw = r#"{"nutrition":{"calories":"520","protein":"lots","carbs":-3,"fats":0,"fiber":7}}"#;
        let n = normalize(raw, &input()).unwrap().nutrition;

        assert_eq!(n.calories, 520.0);
        assert_eq!(n.protein, 20.0);
        assert_eq!(n.carbs, 40.0);
        assert_eq!(n.fats, 0.0);
        assert_eq!(n.fiber, Some(7.0));
        assert_eq!(n.sugar, None);
    }

    #[test]
    fn wrongly_typed_fields_fall_back() {
        let raw = r#"{"name":42,"ingredients":"rice","instructions":["Boil",null,3],"tags":{"a":1},"difficulty":"extreme","prepTime":""}"#;
        let recipe = normalize(raw, &input()).unwrap();

        assert_eq!(recipe.name, DEFAULT_NAME);
        assert!(recipe.ingredients.is_empty());
        assert_eq!(recipe.instructions, vec!["Boil".to_string(), "3".to_string()]);
        assert!(recipe.tags.is_empty());
        assert_eq!(recipe.difficulty, Difficulty::Medium);
        assert_eq!(recipe.prep_time, DEFAULT_PREP_TIME);
    }

    #[test]
    fn instructions_keep_their_order() {
        let raw = r#"{"instructions":["one","two","three"]}"#;
        let recipe = normalize(raw, &input()).unwrap();
        assert_eq!(recipe.instructions, vec!["one", "two", "three"]);
    }

    #[test]
    fn truncated_json_is_a_parse_error() {
        let raw = "```json\n{\"name\": \"Half\", \"ingredients\": [\"a\"\n```";
        assert!(matches!(normalize(raw, &input()), Err(GenerationError::Parse(_))));
    }

    #[test]
    fn draft_schema_describes_an_object() {
        let schema = draft_schema();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"].get("prepTime").is_some());
        assert!(schema["properties"].get("servings").is_none());
    }
}
