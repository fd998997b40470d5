pub mod config;
pub mod error;
pub mod format;
pub mod serializer;
pub mod store;
pub mod tpl;
pub mod value;

#[doc(hidden)]
pub use ctor;
pub use webtpl_macros::template_assets;

pub use config::RendererOptions;
pub use error::{Result, TemplateError};
pub use format::HtmlFormatter;
pub use store::{DirectoryStore, EmbeddedStore, MemoryStore, TemplateSource};
pub use tpl::Renderer;
pub use tpl::context::Context;
pub use value::Value;
