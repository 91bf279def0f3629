pub mod set;
pub mod template;

pub use set::TemplateSet;
pub use template::{Chunk, Template, TemplateResidue};
