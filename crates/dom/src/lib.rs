//! Document model and content extraction
//!
//! An index-based document tree with layout geometry, plus the heuristic
//! passes that find the main article and its headings.
//!
//! ## Core Design
//!
//! ```text
//! snapshot JSON → DomService → DomArena (owned) → DocumentTree → extract
//!                                   ↓
//!                             NodeId (u32)
//! ```
//!
//! The extractor only talks to [`DocumentTree`], so any host tree that can
//! answer the same questions can be outlined.

pub mod arena;
pub mod document;
pub mod error;
pub mod extract;
pub mod selector;
pub mod service;
pub mod types;
pub mod utils;

pub use arena::DomArena;
pub use document::{DocumentMut, DocumentTree};
pub use error::{DomError, Result};
pub use extract::{ensure_anchor, extract_article, extract_article_with, extract_headings, Heading};
pub use selector::Selector;
pub use service::{DomService, DomServiceConfig};
pub use types::*;
