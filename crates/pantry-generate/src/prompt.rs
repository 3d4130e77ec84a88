use pantry_core::{CaloriePreference, DietType, RecipeInput};

const LOW_RANGE: &str = "200-350 calories";
const MEDIUM_RANGE: &str = "400-550 calories";
const HIGH_RANGE: &str = "600-800 calories";

const OUTPUT_GRAMMAR: &str = r#"Please provide a complete recipe in the following JSON format ONLY (no other text):
{
  "name": "Recipe Name",
  "description": "Brief appetizing description of the dish",
  "ingredients": ["ingredient 1 with quantity", "ingredient 2 with quantity", ...],
  "instructions": ["Step 1 detailed instruction", "Step 2 detailed instruction", ...],
  "nutrition": {
    "calories": number,
    "protein": number,
    "carbs": number,
    "fats": number
  },
  "prepTime": "X minutes",
  "cookTime": "X minutes",
  "difficulty": "Easy|Medium|Hard",
  "tags": ["tag1", "tag2"]
}"#;

pub fn diet_label(diet: DietType) -> &'static str {
    match diet {
        DietType::Vegetarian => "Vegetarian (no meat, no fish; dairy and eggs allowed)",
        DietType::NonVegetarian => "Non-Vegetarian (can include meat and fish)",
        DietType::Vegan => "Vegan (no animal products)",
        DietType::Eggetarian => "Eggetarian (vegetarian + eggs, no meat or fish)",
    }
}

/// Per-serving calorie phrase. A custom preference without a positive value
/// falls back to the medium band.
pub fn calorie_target(preference: CaloriePreference, custom: Option<u32>) -> String {
    match (preference, custom) {
        (CaloriePreference::Custom, Some(value)) if value > 0 => format!("{value} calories"),
        (CaloriePreference::Low, _) => LOW_RANGE.to_string(),
        (CaloriePreference::High, _) => HIGH_RANGE.to_string(),
        (CaloriePreference::Medium, _) | (CaloriePreference::Custom, _) => {
            MEDIUM_RANGE.to_string()
        }
    }
}

pub fn system_prompt() -> String {
    "You are a professional chef and nutritionist. Always respond with valid JSON only, \
no additional text."
        .to_string()
}

/// The human-readable requirements: ingredients, diet, calories, servings.
pub fn instruction_block(input: &RecipeInput) -> String {
    let mut out = String::with_capacity(512);

    out.push_str(
        "You are a professional chef and nutritionist. \
Create a detailed recipe based on these requirements:\n\n",
    );
    out.push_str("AVAILABLE INGREDIENTS:\n");
    for ingredient in &input.ingredients {
        out.push_str("- ");
        out.push_str(ingredient);
        out.push('\n');
    }
    out.push('\n');
    out.push_str("DIETARY PREFERENCE: ");
    out.push_str(diet_label(input.diet_type));
    out.push('\n');
    out.push_str("CALORIE TARGET: ");
    out.push_str(&calorie_target(input.calorie_preference, input.custom_calories));
    out.push('\n');
    out.push_str(&format!("SERVINGS: {} people\n", input.serving_size.count()));

    out
}

/// The reply shape the model must produce. id, createdAt, dietType and
/// servings are filled in locally and deliberately absent here.
pub fn output_grammar() -> &'static str {
    OUTPUT_GRAMMAR
}

pub fn user_message(input: &RecipeInput) -> String {
    let diet = diet_label(input.diet_type);
    let calories = calorie_target(input.calorie_preference, input.custom_calories);

    format!(
        "{}\n{}\n\n\
Important:\n\
- Use ONLY the provided ingredients (you may add basic seasonings like salt, pepper, oil)\n\
- Nutrition values should be PER SERVING\n\
- Instructions should be clear and detailed\n\
- Make sure the recipe is {diet}\n\
- Target approximately {calories} per serving",
        instruction_block(input),
        output_grammar(),
    )
}
