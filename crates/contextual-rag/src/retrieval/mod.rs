//! Retrieval of relevant chunks

pub mod search;

pub use search::Retriever;
