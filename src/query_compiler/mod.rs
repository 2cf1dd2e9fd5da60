//! Populate paths and query options compiled into aggregation pipelines

pub mod errors;
pub mod pipeline;
pub mod populate_tree;
pub mod stage;

pub use errors::CompileError;
pub use pipeline::{PipelineCompiler, QueryShape};
pub use populate_tree::{build_populate_tree, PopulateNode};
pub use stage::{to_documents, Lookup, SortKey, Stage};
