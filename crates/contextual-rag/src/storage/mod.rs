//! Storage module for persistent data storage
//!
//! Provides the SQLite-backed vector collection.

mod vector_db;

pub use vector_db::{cosine_similarity, SqliteVectorStore};
