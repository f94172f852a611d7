use revtrail_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias using AuditError
pub type Result<T> = std::result::Result<T, AuditError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Stable classification shared by the core, the store and the engine. Each
/// kind maps to a stable code usable by hosts and in test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Configuration
    ConfigurationInconsistent,
    NotAudited,

    // Inbound data
    InvalidInput,
    SnapshotShapeMismatch,
    MissingIdComponent,
    NotFound,

    // Reconstruction
    Instantiation,

    // Integration/IO
    Persistence,
    Serialization,
    Io,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::ConfigurationInconsistent => "ERR_CONFIGURATION_INCONSISTENT",
            ExErrorKind::NotAudited => "ERR_NOT_AUDITED",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::SnapshotShapeMismatch => "ERR_SNAPSHOT_SHAPE_MISMATCH",
            ExErrorKind::MissingIdComponent => "ERR_MISSING_ID_COMPONENT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Instantiation => "ERR_INSTANTIATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus enough context (operation, entity,
/// property, revision, correlation ids) to diagnose a failed flush or read.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    property: Option<String>,
    revision: Option<u64>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            property: None,
            revision: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(property) = &self.property {
            write!(f, " (property: {})", property)?;
        }
        if let Some(revision) = self.revision {
            write!(f, " (revision: {})", revision)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain errors raised by the audit core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    // ===== Configuration =====
    /// Entity is not under audit (no configuration for it)
    #[error("Entity is not audited: {entity}")]
    UnknownEntity { entity: String },

    /// Property is not an audited collection of the entity
    #[error("No audited collection {property} on entity {entity}")]
    UnknownCollection { entity: String, property: String },

    /// A declared audited parent is not an ancestor of the entity
    #[error("Entity {entity} declares audited parent {parent} which is not one of its ancestors")]
    AuditedParentNotAncestor { entity: String, parent: String },

    /// The parent chain of an entity loops back on itself
    #[error("Parent chain of entity {entity} contains a cycle")]
    ParentCycle { entity: String },

    /// Collection configuration is internally inconsistent
    #[error("Invalid collection {entity}.{property}: {reason}")]
    InvalidCollection {
        entity: String,
        property: String,
        reason: String,
    },

    /// Configuration document could not be parsed
    #[error("Invalid audit configuration: {reason}")]
    InvalidConfiguration { reason: String },

    // ===== Inbound data =====
    /// Snapshot shape does not match the configured collection kind
    #[error("Collection {property} expects a {expected} snapshot, got {actual}")]
    SnapshotShape {
        property: String,
        expected: String,
        actual: String,
    },

    /// An id component required by the id mapping is absent
    #[error("Identifier of {entity} is missing component {field}")]
    MissingIdComponent { entity: String, field: String },

    /// An element does not have the variant the mapping requires
    #[error("Element for {target} must be {expected}, got {actual}")]
    ElementMismatch {
        target: String,
        expected: String,
        actual: String,
    },

    // ===== Reconstruction =====
    /// A historical value could not be constructed
    #[error("Cannot instantiate historical {type_name}: {reason}")]
    Instantiation { type_name: String, reason: String },

    // ===== Internal =====
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<AuditError> for ExError {
    fn from(err: AuditError) -> Self {
        let message = err.to_string();
        match err {
            AuditError::UnknownEntity { entity } => {
                ExError::new(ExErrorKind::NotAudited).with_entity(entity)
            }
            AuditError::UnknownCollection { entity, property } => {
                ExError::new(ExErrorKind::NotAudited)
                    .with_entity(entity)
                    .with_property(property)
            }
            AuditError::AuditedParentNotAncestor { entity, .. }
            | AuditError::ParentCycle { entity } => {
                ExError::new(ExErrorKind::ConfigurationInconsistent).with_entity(entity)
            }
            AuditError::InvalidCollection {
                entity, property, ..
            } => ExError::new(ExErrorKind::ConfigurationInconsistent)
                .with_entity(entity)
                .with_property(property),
            AuditError::InvalidConfiguration { .. } => {
                ExError::new(ExErrorKind::ConfigurationInconsistent)
            }
            AuditError::SnapshotShape { property, .. } => {
                ExError::new(ExErrorKind::SnapshotShapeMismatch).with_property(property)
            }
            AuditError::MissingIdComponent { entity, .. } => {
                ExError::new(ExErrorKind::MissingIdComponent).with_entity(entity)
            }
            AuditError::ElementMismatch { .. } => ExError::new(ExErrorKind::InvalidInput),
            AuditError::Instantiation { type_name, .. } => {
                ExError::new(ExErrorKind::Instantiation).with_entity(type_name)
            }
            AuditError::Serialization { .. } => ExError::new(ExErrorKind::Serialization),
            AuditError::Internal { .. } => ExError::new(ExErrorKind::Internal),
        }
        .with_message(message)
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        AuditError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for AuditError {
    fn from(err: toml::de::Error) -> Self {
        AuditError::InvalidConfiguration {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_share_kind() {
        let cases = [
            AuditError::AuditedParentNotAncestor {
                entity: "Child".into(),
                parent: "Other".into(),
            },
            AuditError::ParentCycle {
                entity: "A".into(),
            },
            AuditError::InvalidConfiguration {
                reason: "bad".into(),
            },
        ];
        for err in cases {
            let ex: ExError = err.into();
            assert_eq!(ex.kind(), ExErrorKind::ConfigurationInconsistent);
            assert_eq!(ex.code(), "ERR_CONFIGURATION_INCONSISTENT");
        }
    }

    #[test]
    fn test_instantiation_keeps_type_name() {
        let ex: ExError = AuditError::Instantiation {
            type_name: "Component4".into(),
            reason: "column missing".into(),
        }
        .into();
        assert_eq!(ex.kind(), ExErrorKind::Instantiation);
        assert_eq!(ex.entity(), Some("Component4"));
        assert!(ex.message().contains("column missing"));
    }

    #[test]
    fn test_display_includes_context() {
        let err = ExError::new(ExErrorKind::Persistence)
            .with_op("flush")
            .with_revision(4)
            .with_message("disk full");
        assert_eq!(
            err.to_string(),
            "[ERR_PERSISTENCE] in operation 'flush': disk full (revision: 4)"
        );
    }
}
