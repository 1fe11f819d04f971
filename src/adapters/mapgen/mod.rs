//! Map generation adapters.

mod template_generator;

pub use template_generator::TemplateMapGenerator;
