//! Prompt templates for plan and illustration generation
//!
//! Templates are Handlebars. Embedded defaults can be overridden by placing
//! `{name}.pmt` in the configured prompts directory.

mod embedded;
mod loader;

pub use loader::{IllustrationPromptContext, PlanPromptContext, PromptLoader};
