//! Index building

mod index_builder;

pub use index_builder::IndexBuilder;
