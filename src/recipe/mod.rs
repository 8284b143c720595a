pub mod ingredient;
pub mod parser;
pub mod rules;

pub use ingredient::{parse_ingredient_line, IngredientParts};
pub use parser::{parse_recipe, TitleGuess};
