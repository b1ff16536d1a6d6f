//! Built-in file interpreters.

mod asset;
mod markdown;
mod template;

use midy_storage::InterpreterRegistry;

pub use asset::AssetInterpreter;
pub use markdown::MarkdownInterpreter;
pub use template::TemplateInterpreter;

/// Registry with the markdown, template and static asset interpreters.
#[must_use]
pub fn default_registry() -> InterpreterRegistry {
    InterpreterRegistry::new()
        .with(AssetInterpreter)
        .with(MarkdownInterpreter)
        .with(TemplateInterpreter)
}
