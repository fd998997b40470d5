mod ast;
mod cache;
pub mod compiler;
pub mod context;
pub(crate) mod engine;
mod expr;
pub mod filters;
mod lexer;
mod render;
mod render_context;
pub mod statement;
pub mod substitute;

pub use cache::remove_template;
pub use engine::Renderer;
