//! Drink catalog data model shared by the API client and its callers.
//!
//! Wire shapes mirror the drinks service exactly: the long form carries named
//! ingredients for baristas, the short form drops names so public menus only
//! reveal colors and proportions.

// self
use crate::_prelude::*;

/// Maximum character count the service accepts for a drink title.
pub const DRINK_TITLE_MAX_LEN: usize = 80;

/// Errors raised while validating a drink draft before it is sent.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DrinkDraftError {
	/// Title must not be empty.
	#[error("Drink title cannot be empty.")]
	MissingTitle,
	/// Title exceeds what the service stores.
	#[error("Drink title exceeds {max} characters.")]
	TitleTooLong {
		/// Maximum permitted character count.
		max: usize,
	},
	/// Recipe must carry at least one ingredient.
	#[error("Drink recipe cannot be empty.")]
	MissingRecipe,
}

/// Single recipe row with the ingredient name visible.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
	/// Ingredient name shown to baristas.
	pub name: String,
	/// Display color used when rendering the glass.
	pub color: String,
	/// Relative proportion of the glass; fractional values occur in real data.
	pub parts: f64,
}
impl Ingredient {
	/// Creates a recipe row.
	pub fn new(name: impl Into<String>, color: impl Into<String>, parts: f64) -> Self {
		Self { name: name.into(), color: color.into(), parts }
	}
}

/// Single recipe row with the ingredient name withheld.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngredientPart {
	/// Display color used when rendering the glass.
	pub color: String,
	/// Relative proportion of the glass.
	pub parts: f64,
}
impl From<&Ingredient> for IngredientPart {
	fn from(ingredient: &Ingredient) -> Self {
		Self { color: ingredient.color.clone(), parts: ingredient.parts }
	}
}

/// Persisted drink in its long form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Drink {
	/// Server-assigned identifier.
	pub id: i64,
	/// Unique display title.
	pub title: String,
	/// Full recipe with ingredient names.
	pub recipe: Vec<Ingredient>,
}
impl Drink {
	/// Returns the short form served on the public menu.
	pub fn summary(&self) -> DrinkSummary {
		DrinkSummary {
			id: self.id,
			title: self.title.clone(),
			recipe: self.recipe.iter().map(IngredientPart::from).collect(),
		}
	}
}

/// Persisted drink in its short form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrinkSummary {
	/// Server-assigned identifier.
	pub id: i64,
	/// Unique display title.
	pub title: String,
	/// Recipe with ingredient names withheld.
	pub recipe: Vec<IngredientPart>,
}

/// Payload for creating a drink.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrinkDraft {
	/// Title for the new drink.
	pub title: String,
	/// Full recipe for the new drink.
	pub recipe: Vec<Ingredient>,
}
impl DrinkDraft {
	/// Starts a draft with the given title and an empty recipe.
	pub fn new(title: impl Into<String>) -> Self {
		Self { title: title.into(), recipe: Vec::new() }
	}

	/// Appends a recipe row.
	pub fn ingredient(mut self, ingredient: Ingredient) -> Self {
		self.recipe.push(ingredient);

		self
	}

	/// Checks the structural requirements the service enforces with a 422.
	pub fn validate(&self) -> Result<(), DrinkDraftError> {
		if self.title.trim().is_empty() {
			return Err(DrinkDraftError::MissingTitle);
		}
		if self.title.len() > DRINK_TITLE_MAX_LEN {
			return Err(DrinkDraftError::TitleTooLong { max: DRINK_TITLE_MAX_LEN });
		}
		if self.recipe.is_empty() {
			return Err(DrinkDraftError::MissingRecipe);
		}

		Ok(())
	}
}

/// Partial update payload; absent fields leave the stored drink untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DrinkPatch {
	/// Replacement title, when present.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	/// Replacement recipe, when present.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub recipe: Option<Vec<Ingredient>>,
}
impl DrinkPatch {
	/// Starts an empty patch.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the replacement title.
	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());

		self
	}

	/// Sets the replacement recipe.
	pub fn recipe(mut self, recipe: Vec<Ingredient>) -> Self {
		self.recipe = Some(recipe);

		self
	}

	/// Returns `true` when the patch would change nothing.
	pub fn is_empty(&self) -> bool {
		self.title.is_none() && self.recipe.is_none()
	}
}
