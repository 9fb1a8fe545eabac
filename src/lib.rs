//! DOM accessibility snapshot engine.
//!
//! Walks a document, keeps only nodes an agent can see or act on, assigns
//! stable `data-aipex-nodeid` identifiers that survive across snapshots,
//! renders a deterministic text form, and answers line-oriented
//! substring/glob queries over it.
//!
//! ```
//! use aipex_snapshot::{build_text, collect_with_defaults, serialize, Document};
//!
//! let mut doc = Document::parse("<button>Save</button>", "https://example.com/");
//! let snapshot = collect_with_defaults(&mut doc);
//! let text = serialize::format(&build_text(&snapshot, None));
//! assert!(text.contains("button \"Save\""));
//!
//! let hits = aipex_snapshot::search_snapshot_text(&text, "save", &Default::default());
//! assert_eq!(hits.total_matches, 2); // the button line and its StaticText
//! ```

pub mod collect;
pub mod diff;
pub mod document;
pub mod dom;
pub mod naming;
pub mod search;
pub mod serialize;
pub mod visibility;

pub use collect::{collect, collect_with_defaults, NODE_ID_ATTR};
pub use document::{CrossOriginFrame, Document, NodeId};
pub use dom::{CollectorOptions, Node, Snapshot, TextSnapshot, TriState};
pub use search::{search_and_format, search_snapshot_text, SearchOptions, SearchResult};
pub use serialize::build_text;
