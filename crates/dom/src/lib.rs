//! Element collection library
//!
//! A small in-memory document model with a chainable collection API on top.
//!
//! ## Core Design
//!
//! ```text
//! markup → parser → DomArena (owned, NodeId = u32) ← Document (Arc + RwLock)
//!                                                        ↓
//!                                  Element handles → ElementCollection
//! ```
//!
//! The arena owns every node. [`Document`] and [`Element`] are cheap handles,
//! and an [`ElementCollection`] is just an ordered list of handles. Operations
//! that only read return data; operations that write return the collection so
//! calls chain.
//!
//! ```
//! use dom::{AttributeSpec, Document};
//!
//! let doc = Document::parse(r#"<ul id="list"><li>one</li></ul>"#);
//! let item = doc.create("li", Some(AttributeSpec::new().text("two")));
//! doc.get("#list").unwrap().append(&item).add_class("filled");
//! assert_eq!(doc.get("li").unwrap().text(), vec!["one", "two"]);
//! ```

pub mod arena;
pub mod collection;
pub mod document;
pub mod error;
pub mod events;
pub mod factory;
pub mod parser;
pub mod selector;
pub mod serializer;
pub mod types;
pub mod utils;

pub use arena::DomArena;
pub use collection::{ClassNames, ElementCollection};
pub use document::{Document, Element};
pub use error::{DomError, Result};
pub use events::{listener, Event, Listener};
pub use factory::{AttributeSpec, Selector};
pub use selector::SelectorList;
pub use serializer::DomSerializer;
pub use types::*;
