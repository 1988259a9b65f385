pub mod engine;
pub mod helpers;
pub mod layout;
pub mod resolver;

pub use engine::TemplateEngine;
pub use layout::{Block, BuildSession, LayoutScript};
pub use resolver::{TemplateResolver, TemplateResource};
