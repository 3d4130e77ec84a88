use crate::{NutritionInfo, Recipe};

/// Render a number without a trailing `.0` when it is whole.
pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.1}")
    }
}

/// Plain-text rendering of a recipe suitable for pasting into a message.
pub fn format_recipe_for_share(recipe: &Recipe) -> String {
    let mut out = String::with_capacity(1024);

    out.push_str(&format!("🍽️ {}\n\n", recipe.name));
    out.push_str(&format!("📝 {}\n\n", recipe.description));
    out.push_str(&format!(
        "⏱️ Prep: {} | Cook: {}\n",
        recipe.prep_time, recipe.cook_time
    ));
    out.push_str(&format!("👥 Servings: {}\n", recipe.servings));
    out.push_str(&format!("📊 Difficulty: {}\n\n", recipe.difficulty));

    out.push_str("📦 INGREDIENTS:\n");
    for (i, ingredient) in recipe.ingredients.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, ingredient));
    }

    out.push_str("\n👨‍🍳 INSTRUCTIONS:\n");
    for (i, step) in recipe.instructions.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, step));
    }

    let n = &recipe.nutrition;
    out.push_str("\n🥗 NUTRITION (per serving):\n");
    out.push_str(&format!("Calories: {} kcal\n", format_amount(n.calories)));
    out.push_str(&format!("Protein: {}g\n", format_amount(n.protein)));
    out.push_str(&format!("Carbs: {}g\n", format_amount(n.carbs)));
    out.push_str(&format!("Fats: {}g\n", format_amount(n.fats)));

    out.push_str("\n--- Made with Pantry Chef 🤖 ---");
    out
}

/// Scale per-serving nutrition up to the whole dish.
pub fn total_nutrition(nutrition: &NutritionInfo, servings: u32) -> NutritionInfo {
    let factor = f64::from(servings);
    NutritionInfo {
        calories: nutrition.calories * factor,
        protein: nutrition.protein * factor,
        carbs: nutrition.carbs * factor,
        fats: nutrition.fats * factor,
        fiber: nutrition.fiber.map(|v| v * factor),
        sugar: nutrition.sugar.map(|v| v * factor),
    }
}

/// Human-readable day for an epoch-millisecond timestamp, e.g. `Mar 4, 2025`.
pub fn format_date(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| "unknown date".to_string())
}

/// Split free text on commas and newlines into trimmed, non-empty entries.
pub fn parse_ingredients(input: &str) -> Vec<String> {
    input
        .split([',', '\n'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// At least one ingredient, and at least one that is more than a single letter.
pub fn validate_ingredients(ingredients: &[String]) -> bool {
    !ingredients.is_empty() && ingredients.iter().any(|i| i.chars().count() >= 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DietType, Difficulty};

    #[test]
    fn share_text_numbers_steps_and_shows_nutrition() {
        let recipe = Recipe {
            id: "r".to_string(),
            name: "Egg Fried Rice".to_string(),
            description: "Quick weeknight rice".to_string(),
            ingredients: vec!["2 eggs".to_string(), "1 cup rice".to_string()],
            instructions: vec!["Scramble eggs".to_string(), "Add rice".to_string()],
            nutrition: NutritionInfo {
                calories: 450.0,
                protein: 18.5,
                carbs: 60.0,
                fats: 12.0,
                fiber: None,
                sugar: None,
            },
            servings: 2,
            prep_time: "5 minutes".to_string(),
            cook_time: "10 minutes".to_string(),
            difficulty: Difficulty::Easy,
            diet_type: DietType::Eggetarian,
            created_at: 0,
            image_url: None,
            tags: vec![],
        };

        let text = format_recipe_for_share(&recipe);

        assert!(text.starts_with("🍽️ Egg Fried Rice\n"));
        assert!(text.contains("1. 2 eggs\n2. 1 cup rice\n"));
        assert!(text.contains("2. Add rice\n"));
        assert!(text.contains("Calories: 450 kcal"));
        assert!(text.contains("Protein: 18.5g"));
        assert!(text.contains("Difficulty: Easy"));
    }

    #[test]
    fn totals_scale_optional_fields() {
        let per = NutritionInfo {
            calories: 300.0,
            protein: 10.0,
            carbs: 30.0,
            fats: 5.0,
            fiber: Some(4.0),
            sugar: None,
        };
        let total = total_nutrition(&per, 4);
        assert_eq!(total.calories, 1200.0);
        assert_eq!(total.fiber, Some(16.0));
        assert_eq!(total.sugar, None);
    }

    #[test]
    fn dates_render_as_month_day_year() {
        assert_eq!(format_date(1_741_046_400_000), "Mar 4, 2025");
    }

    #[test]
    fn ingredient_text_splits_on_commas_and_newlines() {
        assert_eq!(
            parse_ingredients("tomato, onion\n\n garlic ,"),
            vec!["tomato", "onion", "garlic"]
        );
        assert!(validate_ingredients(&parse_ingredients("ok")));
        assert!(!validate_ingredients(&parse_ingredients("a, b")));
        assert!(!validate_ingredients(&[]));
    }
}
