//! Site recipes: per-portal configuration, page identity, and intent
//! classification.
//!
//! A [`SiteRecipe`] captures everything the flow layer needs to know about a
//! target portal without hard-coding it: the page table, intent routes, form
//! hints, and behavioral flags. [`Sitemap`] answers "which known page am I on"
//! from a raw URL, which drives navigation recovery. The keyword classifier
//! maps free-text user prompts onto intent ids when no remote classifier is
//! available.

pub mod builtin;
pub mod classify;
pub mod errors;
pub mod recipe;
pub mod sitemap;

pub use builtin::crop_insurance_recipe;
pub use classify::{classify_intent, ClassifiedIntent};
pub use errors::RecipeError;
pub use recipe::{IntentSpec, SiteRecipe};
pub use sitemap::Sitemap;
