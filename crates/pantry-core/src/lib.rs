pub mod settings;
pub mod share;
pub mod storage;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// --- Types ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DietType {
    #[default]
    #[serde(rename = "veg", alias = "vegetarian")]
    Vegetarian,
    #[serde(rename = "non-veg", alias = "non-vegetarian")]
    NonVegetarian,
    #[serde(rename = "vegan")]
    Vegan,
    #[serde(rename = "eggetarian")]
    Eggetarian,
}

impl DietType {
    pub const ALL: [DietType; 4] = [
        DietType::Vegetarian,
        DietType::NonVegetarian,
        DietType::Vegan,
        DietType::Eggetarian,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DietType::Vegetarian => "Vegetarian",
            DietType::NonVegetarian => "Non-Vegetarian",
            DietType::Vegan => "Vegan",
            DietType::Eggetarian => "Eggetarian",
        }
    }

    fn wire_name(self) -> &'static str {
        match self {
            DietType::Vegetarian => "veg",
            DietType::NonVegetarian => "non-veg",
            DietType::Vegan => "vegan",
            DietType::Eggetarian => "eggetarian",
        }
    }
}

impl fmt::Display for DietType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for DietType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "veg" | "vegetarian" => Ok(DietType::Vegetarian),
            "non-veg" | "nonveg" | "non-vegetarian" => Ok(DietType::NonVegetarian),
            "vegan" => Ok(DietType::Vegan),
            "egg" | "eggetarian" => Ok(DietType::Eggetarian),
            other => Err(format!("unknown diet type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaloriePreference {
    Low,
    #[default]
    Medium,
    High,
    Custom,
}

impl CaloriePreference {
    pub fn label(self) -> &'static str {
        match self {
            CaloriePreference::Low => "Low",
            CaloriePreference::Medium => "Medium",
            CaloriePreference::High => "High",
            CaloriePreference::Custom => "Custom",
        }
    }
}

impl FromStr for CaloriePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(CaloriePreference::Low),
            "medium" => Ok(CaloriePreference::Medium),
            "high" => Ok(CaloriePreference::High),
            "custom" => Ok(CaloriePreference::Custom),
            other => Err(format!("unknown calorie preference: {other}")),
        }
    }
}

/// Number of people a recipe is generated for. Serialized as a plain number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(try_from = "u32", into = "u32")]
pub enum ServingSize {
    One,
    #[default]
    Two,
    Four,
    Six,
}

impl ServingSize {
    pub const ALL: [ServingSize; 4] = [
        ServingSize::One,
        ServingSize::Two,
        ServingSize::Four,
        ServingSize::Six,
    ];

    pub fn count(self) -> u32 {
        match self {
            ServingSize::One => 1,
            ServingSize::Two => 2,
            ServingSize::Four => 4,
            ServingSize::Six => 6,
        }
    }
}

impl TryFrom<u32> for ServingSize {
    type Error = String;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(ServingSize::One),
            2 => Ok(ServingSize::Two),
            4 => Ok(ServingSize::Four),
            6 => Ok(ServingSize::Six),
            other => Err(format!("serving size must be 1, 2, 4 or 6 (got {other})")),
        }
    }
}

impl From<ServingSize> for u32 {
    fn from(size: ServingSize) -> Self {
        size.count()
    }
}

impl FromStr for ServingSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("not a number: {s}"))?;
        ServingSize::try_from(n)
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, schemars::JsonSchema,
)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Case-insensitive match against the three known levels.
    pub fn parse_loose(s: &str) -> Option<Difficulty> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        })
    }
}

/// Per-serving nutrition. Protein, carbs and fats are grams.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct NutritionInfo {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub nutrition: NutritionInfo,
    pub servings: u32,
    pub prep_time: String,
    pub cook_time: String,
    pub difficulty: Difficulty,
    pub diet_type: DietType,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub saved_at: i64,
}

impl FavoriteRecipe {
    pub fn new(recipe: Recipe, saved_at: i64) -> Self {
        Self { recipe, saved_at }
    }

    pub fn id(&self) -> &str {
        &self.recipe.id
    }
}

/// What the wizard collected, handed to the generator as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeInput {
    pub ingredients: Vec<String>,
    pub diet_type: DietType,
    pub calorie_preference: CaloriePreference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_calories: Option<u32>,
    pub serving_size: ServingSize,
}

// --- Ids and clocks ---

/// Current time as Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a fresh recipe id: `recipe_<millis>_<9 random chars>`.
pub fn new_recipe_id() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("recipe_{}_{}", now_millis(), &random[..9])
}

// --- Storage location ---

/// Resolve the data directory (~/.pantry-chef/, or $PANTRY_CHEF_HOME).
pub fn data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("PANTRY_CHEF_HOME") {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pantry-chef")
}
