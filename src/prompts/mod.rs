//! Prompt authoring: templates, personas, and request building.
//!
//! Templates live in a YAML library file and render through Tera with a
//! per-problem context. The request builder expands the benchmark
//! cross-product into the ordered request sequence the batch coordinator
//! consumes.

pub mod builder;
pub mod persona;
pub mod template;

pub use builder::RequestBuilder;
pub use persona::{PersonaLibrary, PersonaProfile};
pub use template::{PromptLibrary, PromptTemplate};
