//! Default pipeline stages.
//!
//! The standard document processing pipeline consists of:
//!
//! 1. **TemplateBodyStage** - Process template syntax in the body (filters, variables, loops)
//! 2. **MarkdownStage** - Convert the body to HTML with the document's content format
//! 3. **LayoutStage** - Wrap content in the document's layout

mod layout;
mod markdown;
mod template_body;

pub use layout::LayoutStage;
pub use markdown::MarkdownStage;
pub use template_body::TemplateBodyStage;
