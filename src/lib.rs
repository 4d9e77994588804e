//! Single-best-match retrieval over stored `f64` embeddings, used to ground a
//! chat completion in one stored chunk of text.
//!
//! ```text
//! query ─embed─▶ vector ─scan stored blobs (cosine)─▶ best chunk
//!                                                        │
//!             answer ◀─generate─ augmented prompt ◀──────┘
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod retriever;
pub mod similarity;
pub mod store;
pub mod vector_db;

pub use error::{RagError, Result};
pub use retriever::{Mode, Retriever};
pub use vector_db::{Candidate, RetrievalIndex};
