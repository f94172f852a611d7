//! Historical reads.

#![allow(clippy::result_large_err)]

use revtrail_core::config::AuditMetadata;
use revtrail_core::errors::{AuditError, ExError};
use revtrail_core::model::{DataMap, EntityId, Revision};
use revtrail_core::query::{EntityAtRevisionQueryGenerator, EntityRevisionsQueryGenerator};
use revtrail_core::{log_op_end, log_op_error, log_op_start, CollectionMapper, CollectionTarget, HistoricalCollection};
use revtrail_store::errors::Result;
use revtrail_store::query::execute;
use rusqlite::Connection;

/// Read access to audit history
#[derive(Debug, Clone, Copy)]
pub struct AuditReader<'a> {
    metadata: &'a AuditMetadata,
    conn: &'a Connection,
}

fn read_error(err: AuditError, op: &str, revision: Option<Revision>) -> ExError {
    let ex = ExError::from(err).with_op(op);
    match revision {
        Some(revision) => ex.with_revision(revision.number()),
        None => ex,
    }
}

impl<'a> AuditReader<'a> {
    pub fn new(metadata: &'a AuditMetadata, conn: &'a Connection) -> Self {
        Self { metadata, conn }
    }

    /// Audited state of an entity at a revision, `None` if it did not
    /// exist or had been deleted.
    ///
    /// # Errors
    ///
    /// `NotAudited`, `MissingIdComponent` or `Persistence`.
    pub fn find_entity(
        &self,
        entity: &str,
        id: &EntityId,
        revision: Revision,
    ) -> Result<Option<DataMap>> {
        let generator = EntityAtRevisionQueryGenerator::new(self.metadata, entity)
            .map_err(|e| read_error(e, "find_entity", Some(revision)))?;
        let bound = generator
            .bind(id, revision)
            .map_err(|e| read_error(e, "find_entity", Some(revision)))?;
        Ok(execute(self.conn, &bound)?
            .into_iter()
            .next()
            .and_then(|row| row.values.into_iter().next().map(|(_, values)| values)))
    }

    /// Revisions at which an entity was audited, oldest first
    ///
    /// # Errors
    ///
    /// `NotAudited`, `MissingIdComponent` or `Persistence`.
    pub fn revisions_of(&self, entity: &str, id: &EntityId) -> Result<Vec<Revision>> {
        let generator = EntityRevisionsQueryGenerator::new(self.metadata, entity)
            .map_err(|e| read_error(e, "revisions_of", None))?;
        let bound = generator
            .bind(id)
            .map_err(|e| read_error(e, "revisions_of", None))?;
        let field = &self.metadata.global.revision_field;
        let mut revisions: Vec<Revision> = execute(self.conn, &bound)?
            .iter()
            .filter_map(|row| row.values.values().next())
            .filter_map(|values| values.get(field).and_then(|v| v.as_int()))
            .map(|rev| Revision(rev as u64))
            .collect();
        revisions.dedup();
        Ok(revisions)
    }

    /// A collection as it was at a revision.
    ///
    /// `None` when the owner did not exist or was deleted at that revision.
    ///
    /// # Errors
    ///
    /// `NotAudited`, `MissingIdComponent`, `Instantiation` or `Persistence`.
    pub fn find_collection(
        &self,
        entity: &str,
        id: &EntityId,
        property: &str,
        revision: Revision,
    ) -> Result<Option<HistoricalCollection>> {
        log_op_start!(
            "find_collection",
            entity = entity,
            property = property,
            revision = revision.number()
        );
        let start = std::time::Instant::now();

        let result = self
            .find_collection_impl(entity, id, property, revision)
            .map_err(|e| {
                log_op_error!(
                    "find_collection",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "find_collection",
            duration_ms = start.elapsed().as_millis() as u64,
            found = result.is_some()
        );
        Ok(result)
    }

    fn find_collection_impl(
        &self,
        entity: &str,
        id: &EntityId,
        property: &str,
        revision: Revision,
    ) -> Result<Option<HistoricalCollection>> {
        let op = "find_collection";
        let mapper = CollectionMapper::new(self.metadata, entity, property)
            .map_err(|e| read_error(e, op, Some(revision)).with_property(property))?;

        if self.find_entity(entity, id, revision)?.is_none() {
            tracing::debug!(entity, id = %id, "owner has no live audit row at revision");
            return Ok(None);
        }

        let generator = mapper
            .query_generator()
            .map_err(|e| read_error(e, op, Some(revision)))?;
        let bound = generator
            .bind(id, revision)
            .map_err(|e| read_error(e, op, Some(revision)))?;
        let rows = execute(self.conn, &bound)?;
        let collection = mapper
            .materialize(&rows)
            .map_err(|e| read_error(e, op, Some(revision)).with_property(property))?;
        Ok(Some(collection))
    }

    /// Reconstruct a collection and write it onto `target`.
    ///
    /// Returns `false`, leaving `target` untouched, when the owner has no
    /// live state at the revision.
    ///
    /// # Errors
    ///
    /// As [`AuditReader::find_collection`].
    pub fn restore_collection(
        &self,
        target: &mut dyn CollectionTarget,
        entity: &str,
        id: &EntityId,
        property: &str,
        revision: Revision,
    ) -> Result<bool> {
        let Some(collection) = self.find_collection(entity, id, property, revision)? else {
            return Ok(false);
        };
        CollectionMapper::new(self.metadata, entity, property)
            .map_err(|e| read_error(e, "restore_collection", Some(revision)))?
            .apply_to_entity(target, &collection, revision);
        Ok(true)
    }
}
