//! Populate tree + query shape -> ordered aggregation pipeline.
//!
//! Every populated relationship becomes a `$lookup` whose sub-pipeline is
//! correlated through a bound variable. Children of a populate node are
//! compiled against the relationship target and spliced into the parent's
//! sub-pipeline ahead of the correlation match, so nested joins wrap inward:
//!
//! ```text
//! $lookup(members) [
//!     $lookup(user) [
//!         $lookup(profile) [ $match(user_id == $$local_3) ]
//!         $unwind(profile)
//!         $match(_id == $$local_2)
//!     ]
//!     $unwind(user)
//!     $match(conversation_id == $$local_1)
//! ]
//! ```
//!
//! Single-valued kinds (`hasOne`, `belongTo`) are followed by an `$unwind`
//! that keeps records without a related row. After all lookups the query
//! shape is appended as `$match`, `$sort`, `$skip`, `$limit`, `$project`.

use crate::config::OdmConfig;
use crate::driver::Document;
use crate::schema::{RecordTypeMetadata, Registry};

use super::errors::CompileError;
use super::populate_tree::PopulateNode;
use super::stage::{Lookup, SortKey, Stage};

/// Non-populate part of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryShape {
    pub filter: Document,
    pub projection: Document,
    pub sort: Vec<SortKey>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

pub struct PipelineCompiler<'r> {
    registry: &'r Registry,
    max_depth: usize,
    strict: bool,
}

impl<'r> PipelineCompiler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self::from_config(registry, &OdmConfig::default())
    }

    pub fn from_config(registry: &'r Registry, config: &OdmConfig) -> Self {
        PipelineCompiler {
            registry,
            max_depth: config.max_populate_depth,
            strict: config.strict_populate,
        }
    }

    pub fn compile(
        &self,
        metadata: &RecordTypeMetadata,
        tree: &[PopulateNode],
        shape: &QueryShape,
    ) -> Result<Vec<Stage>, CompileError> {
        let mut stages = self.compile_populate(metadata, tree, 1)?;

        if !shape.filter.is_empty() {
            stages.push(Stage::Match(shape.filter.clone()));
        }
        if !shape.sort.is_empty() {
            stages.push(Stage::Sort(shape.sort.clone()));
        }
        if let Some(skip) = shape.skip {
            stages.push(Stage::Skip(skip));
        }
        if let Some(limit) = shape.limit {
            stages.push(Stage::Limit(limit));
        }
        if !shape.projection.is_empty() {
            stages.push(Stage::Project(shape.projection.clone()));
        }

        log::debug!(
            "PipelineCompiler: {} -> {} stages",
            metadata.type_name(),
            stages.len()
        );
        Ok(stages)
    }

    /// Lookup stages for one populate level; `depth` starts at 1
    pub fn compile_populate(
        &self,
        metadata: &RecordTypeMetadata,
        nodes: &[PopulateNode],
        depth: usize,
    ) -> Result<Vec<Stage>, CompileError> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        if depth > self.max_depth {
            return Err(CompileError::DepthExceeded {
                max: self.max_depth,
            });
        }

        let mut stages = Vec::new();
        for node in nodes {
            let relationship = metadata
                .field(&node.name)
                .and_then(|field| field.relationship.as_ref());

            let Some(relationship) = relationship else {
                if self.strict {
                    return Err(CompileError::UnknownPopulate {
                        record: metadata.type_name().to_string(),
                        name: node.name.clone(),
                    });
                }
                log::debug!(
                    "PipelineCompiler: {} has no relationship '{}', dropping it",
                    metadata.type_name(),
                    node.name
                );
                continue;
            };

            let variable = format!("local_{}", depth);
            let mut pipeline = if node.children.is_empty() {
                Vec::new()
            } else {
                let target = relationship.target_metadata(self.registry)?;
                self.compile_populate(&target, &node.children, depth + 1)?
            };
            pipeline.push(Stage::correlation_match(&relationship.foreign_key, &variable));

            stages.push(Stage::Lookup(Lookup {
                from: relationship.collection.clone(),
                variable,
                local_field: relationship.local_key.clone(),
                pipeline,
                alias: relationship.alias.clone(),
            }));
            if relationship.kind.is_single() {
                stages.push(Stage::unwind(&relationship.alias));
            }
        }

        Ok(stages)
    }
}
