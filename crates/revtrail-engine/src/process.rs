//! Audit unit of work.
//!
//! ## Flush pipeline (in order):
//! 1. Nothing pending: no revision is allocated, nothing is written
//! 2. Open a transaction and allocate the revision
//! 3. Resolve entity rows (markers and foreign-key mirrors read the
//!    latest audited state)
//! 4. Stamp entity rows, then middle records, through the active strategy
//! 5. Apply the writes and commit
//!
//! Any failure rolls the transaction back, revision included.

#![allow(clippy::result_large_err)]

use crate::work::{EntityUnit, PendingEntity, PendingWork};
use revtrail_core::config::AuditMetadata;
use revtrail_core::errors::ExError;
use revtrail_core::model::{
    CollectionChange, DataMap, EntityChange, EntityId, Revision, RevisionType, Value, WriteOp,
};
use revtrail_core::query::EntityAtRevisionQueryGenerator;
use revtrail_core::{log_op_end, log_op_error, log_op_start, plan_collection_change, AuditError, Mirror};
use revtrail_core_types::RequestContext;
use revtrail_store::errors::{from_rusqlite, Result};
use revtrail_store::query::execute;
use revtrail_store::revision::allocate;
use revtrail_store::writer::apply_write_ops;
use rusqlite::Connection;

/// Changes of one host unit of work, written under a single revision
#[derive(Debug)]
pub struct AuditProcess<'a> {
    metadata: &'a AuditMetadata,
    context: RequestContext,
    work: PendingWork,
}

impl<'a> AuditProcess<'a> {
    pub fn new(metadata: &'a AuditMetadata) -> Self {
        Self::with_context(metadata, RequestContext::new())
    }

    pub fn with_context(metadata: &'a AuditMetadata, context: RequestContext) -> Self {
        Self {
            metadata,
            context,
            work: PendingWork::default(),
        }
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn is_empty(&self) -> bool {
        self.work.is_empty()
    }

    /// Record an entity insert, update or delete.
    ///
    /// # Errors
    ///
    /// `NotAudited` if the entity has no audit configuration.
    pub fn entity_changed(&mut self, change: EntityChange) -> Result<()> {
        self.metadata
            .entity(&change.entity)
            .map_err(|e| self.error(e, "entity_changed"))?;
        self.work.add_entity_change(
            &change.entity,
            &change.id,
            change.revision_type,
            change.state,
        );
        Ok(())
    }

    /// Record a collection property change.
    ///
    /// # Errors
    ///
    /// Configuration lookups, snapshot shape mismatches and record building
    /// failures; nothing is buffered when this fails.
    pub fn collection_changed(&mut self, change: &CollectionChange) -> Result<()> {
        let plan = plan_collection_change(self.metadata, change)
            .map_err(|e| self.error(e, "collection_changed"))?;
        tracing::debug!(
            entity = %change.owner_entity,
            property = %change.property,
            record_count = plan.records.len(),
            mirror_count = plan.mirrors.len(),
            "planned collection change"
        );

        for record in plan.records {
            self.work.add_record(record);
        }
        for mirror in plan.mirrors {
            match mirror {
                Mirror::Marker { entity, id } => self.work.add_marker(&entity, &id),
                Mirror::ForeignKey {
                    entity,
                    id,
                    mapped_by,
                    value,
                } => self.work.add_foreign_key(&entity, &id, &mapped_by, value),
            }
        }
        if let Some(owner) = plan.owner_marker {
            self.work.add_marker(&owner.entity, &owner.id);
        }
        Ok(())
    }

    /// Write everything pending under one new revision.
    ///
    /// Returns `None` without touching the database when nothing is
    /// pending.
    ///
    /// # Errors
    ///
    /// `Persistence` for database failures, `MissingIdComponent` when a
    /// reported id lacks a declared id field. The transaction is rolled
    /// back on any error.
    pub fn flush(self, conn: &mut Connection) -> Result<Option<Revision>> {
        if self.work.is_empty() {
            tracing::debug!(request_id = %self.context.request_id, "nothing to audit");
            return Ok(None);
        }

        log_op_start!(
            "flush",
            request_id = %self.context.request_id
        );
        let start = std::time::Instant::now();

        let result = self.flush_impl(conn).map_err(|e| {
            log_op_error!(
                "flush",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "flush",
            duration_ms = start.elapsed().as_millis() as u64,
            revision = result.0.number(),
            row_count = result.1
        );
        Ok(Some(result.0))
    }

    fn flush_impl(&self, conn: &mut Connection) -> Result<(Revision, usize)> {
        let tx = conn.transaction().map_err(from_rusqlite)?;
        let revision = allocate(&tx)?;

        let mut ops = Vec::new();
        for pending in self.work.entities() {
            ops.extend(self.entity_ops(&tx, pending, revision)?);
        }
        ops.extend(self.record_ops(revision));

        let rows = apply_write_ops(&tx, &ops)
            .map_err(|e| e.with_revision(revision.number()))?;
        tx.commit().map_err(from_rusqlite)?;
        Ok((revision, rows))
    }

    /// Middle records, stamped with the revision
    fn record_ops(&self, revision: Revision) -> Vec<WriteOp> {
        let strategy = self.metadata.strategy();
        self.work
            .records()
            .flat_map(|record| {
                strategy.stamp_on_insert(
                    &self.metadata.global,
                    &record.middle_table,
                    &record.logical_key,
                    record.row(),
                    revision,
                )
            })
            .collect()
    }

    /// One entity audit row
    fn entity_ops(
        &self,
        conn: &Connection,
        pending: &PendingEntity,
        revision: Revision,
    ) -> Result<Vec<WriteOp>> {
        let global = &self.metadata.global;
        let config = self
            .metadata
            .entity(&pending.entity)
            .map_err(|e| self.error(e, "flush"))?;

        let (revision_type, state) = match &pending.unit {
            EntityUnit::Change {
                revision_type,
                state,
            } => (*revision_type, Some(state.clone())),
            EntityUnit::Marker => (RevisionType::Mod, None),
            // Filtered out by PendingWork::entities
            EntityUnit::Cancelled => return Ok(Vec::new()),
        };
        let mut state = match state {
            Some(state) => state,
            None => self.latest_state(conn, &pending.entity, &pending.id, revision)?,
        };
        if revision_type != RevisionType::Del {
            self.apply_foreign_keys(pending, &mut state)?;
        }

        let mut key = DataMap::new();
        for field in &config.id_fields {
            let value = pending.id.get(field).ok_or_else(|| {
                self.error(
                    AuditError::MissingIdComponent {
                        entity: pending.entity.clone(),
                        field: field.clone(),
                    },
                    "flush",
                )
            })?;
            key.insert(field.clone(), value.clone());
        }

        let mut row = key.clone();
        let fields = self
            .metadata
            .audited_state_fields(&pending.entity)
            .map_err(|e| self.error(e, "flush"))?;
        for field in fields {
            // Deletions keep no state
            let value = match revision_type {
                RevisionType::Del => Value::Null,
                _ => state.get(&field).cloned().unwrap_or(Value::Null),
            };
            row.insert(field, value);
        }
        row.insert(global.revision_type_field.clone(), revision_type.to_value());

        Ok(self.metadata.strategy().stamp_on_insert(
            global,
            &config.audit_table,
            &key,
            row,
            revision,
        ))
    }

    /// Audited state of an entity as last written, or empty if it has no
    /// live audit row
    fn latest_state(
        &self,
        conn: &Connection,
        entity: &str,
        id: &EntityId,
        revision: Revision,
    ) -> Result<DataMap> {
        let generator = EntityAtRevisionQueryGenerator::new(self.metadata, entity)
            .map_err(|e| self.error(e, "flush"))?;
        // Nothing has been written at `revision` yet
        let bound = generator
            .bind(id, revision)
            .map_err(|e| self.error(e, "flush"))?;
        let state = execute(conn, &bound)?
            .into_iter()
            .next()
            .and_then(|row| row.values.into_iter().next().map(|(_, values)| values))
            .unwrap_or_default();
        if state.is_empty() {
            tracing::debug!(entity, id = %id, "no audited state to carry over");
        }
        Ok(state)
    }

    /// Point `<mapped_by>_<owner id field>` columns at the new owner
    fn apply_foreign_keys(&self, pending: &PendingEntity, state: &mut DataMap) -> Result<()> {
        if pending.foreign_keys.is_empty() {
            return Ok(());
        }
        let fields = self
            .metadata
            .audited_state_fields(&pending.entity)
            .map_err(|e| self.error(e, "flush"))?;
        for (mapped_by, owner) in &pending.foreign_keys {
            let prefix = format!("{}_", mapped_by);
            let mut matched = false;
            for field in fields.iter().filter(|f| f.starts_with(&prefix)) {
                matched = true;
                let value = owner
                    .as_ref()
                    .and_then(|id| id.get(&field[prefix.len()..]).cloned())
                    .unwrap_or(Value::Null);
                state.insert(field.clone(), value);
            }
            if !matched {
                tracing::debug!(
                    entity = %pending.entity,
                    mapped_by = %mapped_by,
                    "no audited column for foreign key"
                );
            }
        }
        Ok(())
    }

    fn error(&self, err: AuditError, op: &str) -> ExError {
        let mut ex = ExError::from(err)
            .with_op(op)
            .with_request_id(self.context.request_id.clone());
        if let Some(trace_id) = &self.context.trace_id {
            ex = ex.with_trace_id(trace_id.clone());
        }
        ex
    }
}
