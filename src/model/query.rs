//! Query builder. Without populate paths a query runs as a plain `find`;
//! with them it is compiled to a pipeline and run as an aggregation.

use serde_json::Value;

use super::Model;
use crate::driver::{ChangeInfo, Document, FindOptions};
use crate::errors::OdmError;
use crate::lifecycle::{decode, decode_all};
use crate::query_compiler::{build_populate_tree, to_documents, PipelineCompiler, QueryShape, SortKey, Stage};
use crate::schema::Record;

/// Result shape a query was created for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Destination of [`Query::exec`]
pub enum ResultSet<'a, R> {
    One(&'a mut R),
    Many(&'a mut Vec<R>),
}

impl<R> ResultSet<'_, R> {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            ResultSet::One(_) => Cardinality::One,
            ResultSet::Many(_) => Cardinality::Many,
        }
    }
}

const COUNT_FIELD: &str = "count";

pub struct Query<R> {
    model: Model<R>,
    cardinality: Cardinality,
    filter: Document,
    projection: Document,
    sort: Vec<SortKey>,
    skip: Option<u64>,
    limit: Option<u64>,
    populate: Vec<String>,
}

impl<R: Record> Query<R> {
    pub(crate) fn new(model: Model<R>, filter: Document, cardinality: Cardinality) -> Self {
        Query {
            model,
            cardinality,
            filter,
            projection: Document::new(),
            sort: Vec::new(),
            skip: None,
            limit: None,
            populate: Vec::new(),
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn select(mut self, projection: Document) -> Self {
        self.projection = projection;
        self
    }

    /// `"field"` ascending, `"-field"` descending; appends to earlier keys
    pub fn sort<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.sort
            .extend(keys.into_iter().map(|key| SortKey::parse(key.as_ref())));
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.skip = (n > 0).then_some(n);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = (n > 0).then_some(n);
        self
    }

    /// Dotted relationship path; `"A,B"` adds both
    pub fn populate(mut self, paths: &str) -> Self {
        self.populate.extend(
            paths
                .split(',')
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(str::to_string),
        );
        self
    }

    /// Include soft-deleted records
    pub fn with_deleted(mut self) -> Self {
        self.model = self.model.with_deleted();
        self
    }

    /// Compile without executing
    pub fn pipeline(&self) -> Result<Vec<Stage>, OdmError> {
        let tree = build_populate_tree(&self.populate);
        let shape = QueryShape {
            filter: self.model.scope(self.filter.clone()),
            projection: self.projection.clone(),
            sort: self.sort.clone(),
            skip: self.skip,
            limit: self.limit,
        };
        let compiler = PipelineCompiler::from_config(self.model.registry(), self.model.config());
        Ok(compiler.compile(self.model.metadata(), &tree, &shape)?)
    }

    /// Fill `result`, which must match the cardinality the query was built
    /// with
    pub fn exec(&self, result: ResultSet<'_, R>) -> Result<(), OdmError> {
        if result.cardinality() != self.cardinality {
            return Err(OdmError::InvalidParams(format!(
                "query on {} expects {:?} result(s), got a {:?} result set",
                self.model.collection(),
                self.cardinality,
                result.cardinality()
            )));
        }

        match result {
            ResultSet::One(record) => *record = decode(self.fetch_one()?)?,
            ResultSet::Many(records) => *records = decode_all(self.fetch_all()?)?,
        }
        Ok(())
    }

    pub fn one(&self) -> Result<R, OdmError> {
        decode(self.fetch_one()?)
    }

    pub fn all(&self) -> Result<Vec<R>, OdmError> {
        decode_all(self.fetch_all()?)
    }

    /// Number of matches, counted through the pipeline when populating
    pub fn count(&self) -> Result<u64, OdmError> {
        let collection = self.model.collection();
        if self.populate.is_empty() {
            return self
                .model
                .driver()
                .count(collection, &self.model.scope(self.filter.clone()))
                .map_err(|e| OdmError::from_driver(collection, e));
        }

        let mut stages = self.pipeline()?;
        stages.push(Stage::Count(COUNT_FIELD.to_string()));
        let counted = self
            .model
            .driver()
            .pipeline_all(collection, &to_documents(&stages))
            .map_err(|e| OdmError::from_driver(collection, e))?;

        match counted.first().map(|document| document.get(COUNT_FIELD)) {
            None => Ok(0),
            Some(Some(Value::Number(n))) => n.as_u64().ok_or_else(|| {
                OdmError::InvalidParams(format!("count stage returned {}", n))
            }),
            Some(other) => Err(OdmError::InvalidParams(format!(
                "count stage returned {:?}",
                other
            ))),
        }
    }

    pub fn remove(&self) -> Result<(), OdmError> {
        let collection = self.model.collection();
        self.model
            .driver()
            .remove(collection, &self.model.scope(self.filter.clone()))
            .map_err(|e| OdmError::from_driver(collection, e))
    }

    pub fn remove_all(&self) -> Result<ChangeInfo, OdmError> {
        let collection = self.model.collection();
        self.model
            .driver()
            .remove_all(collection, &self.model.scope(self.filter.clone()))
            .map_err(|e| OdmError::from_driver(collection, e))
    }

    fn find_options(&self) -> FindOptions {
        FindOptions {
            filter: self.model.scope(self.filter.clone()),
            projection: self.projection.clone(),
            sort: self.sort.clone(),
            skip: self.skip,
            limit: self.limit,
        }
    }

    fn fetch_one(&self) -> Result<Document, OdmError> {
        let collection = self.model.collection();
        let found = if self.populate.is_empty() {
            self.model.driver().find_one(collection, &self.find_options())
        } else {
            let mut stages = self.pipeline()?;
            if self.limit.is_none() {
                stages.push(Stage::Limit(1));
            }
            self.model
                .driver()
                .pipeline_one(collection, &to_documents(&stages))
        };
        found.map_err(|e| OdmError::from_driver(collection, e))
    }

    fn fetch_all(&self) -> Result<Vec<Document>, OdmError> {
        let collection = self.model.collection();
        let found = if self.populate.is_empty() {
            self.model.driver().find_all(collection, &self.find_options())
        } else {
            let stages = self.pipeline()?;
            log::debug!(
                "Query: {} populate pipeline with {} stages",
                collection,
                stages.len()
            );
            self.model
                .driver()
                .pipeline_all(collection, &to_documents(&stages))
        };
        found.map_err(|e| OdmError::from_driver(collection, e))
    }
}
