pub mod fragment;
pub mod page;
pub mod recipe;
pub mod scan;

pub use fragment::{BoundingBox, TextFragment};
pub use page::{Page, PageNumberGuess};
pub use recipe::{Ingredient, Instruction, Recipe, Technique};
pub use scan::{Scan, ScanListItem, ScanMetadata, ScanStatus};
