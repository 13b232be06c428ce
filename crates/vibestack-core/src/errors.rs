use thiserror::Error;
use vibestack_core_types::RequestId;

/// Result type alias using the canonical structured error
pub type Result<T> = std::result::Result<T, ExError>;

/// Result type alias for pure domain operations
pub type CoreResult<T> = std::result::Result<T, VibeError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling,
/// tests and the CLI's exit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Validation
    InvalidInput,
    InvalidPath,
    InvalidManifest,

    // Referential
    /// Referenced project, branch, snapshot or deployment is absent
    NotFound,
    /// Duplicate branch name on fork, or a deployment still in flight
    Conflict,
    /// A parent id in a snapshot chain does not resolve (never repaired)
    BrokenHistory,
    /// A manifest or artifact blob referenced by a row is missing
    MissingBlob,

    // Concurrency / lifecycle
    /// The branch head moved between read and conditional update
    HeadMismatch,
    /// A deployment state change that the lifecycle does not allow
    InvalidTransition,

    // External collaborators
    /// The deployment publish step failed; recorded on the deployment
    PublishFailure,
    Timeout,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidPath => "ERR_INVALID_PATH",
            ExErrorKind::InvalidManifest => "ERR_INVALID_MANIFEST",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Conflict => "ERR_CONFLICT",
            ExErrorKind::BrokenHistory => "ERR_BROKEN_HISTORY",
            ExErrorKind::MissingBlob => "ERR_MISSING_BLOB",
            ExErrorKind::HeadMismatch => "ERR_HEAD_MISMATCH",
            ExErrorKind::InvalidTransition => "ERR_INVALID_TRANSITION",
            ExErrorKind::PublishFailure => "ERR_PUBLISH_FAILURE",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether a caller may retry the failed operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExErrorKind::PublishFailure | ExErrorKind::Timeout | ExErrorKind::HeadMismatch
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification plus the identifiers involved, so a failure can
/// be reported to the user without re-deriving which project, branch or
/// snapshot the operation touched.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    project_id: Option<String>,
    branch: Option<String>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            project_id: None,
            branch: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context (snapshot, deployment, blob digest...)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add project context
    pub fn with_project_id(mut self, id: impl Into<String>) -> Self {
        self.project_id = Some(id.into());
        self
    }

    /// Add branch name context
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the project context, if any
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Get the branch context, if any
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
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
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(project_id) = &self.project_id {
            write!(f, " (project_id: {})", project_id)?;
        }
        if let Some(branch) = &self.branch {
            write!(f, " (branch: {})", branch)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " <- {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Errors raised by pure domain operations in this crate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VibeError {
    /// A file path failed normalisation
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Manifest bytes could not be decoded
    #[error("Invalid manifest: {reason}")]
    InvalidManifest { reason: String },

    /// An AI patch response could not be parsed
    #[error("Patch parse error at line {line}: {reason}")]
    PatchParse { line: usize, reason: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<VibeError> for ExError {
    fn from(err: VibeError) -> Self {
        match err {
            VibeError::InvalidPath { ref path, .. } => ExError::new(ExErrorKind::InvalidPath)
                .with_entity_id(path.clone())
                .with_message(err.to_string()),

            VibeError::InvalidManifest { .. } => {
                ExError::new(ExErrorKind::InvalidManifest).with_message(err.to_string())
            }

            VibeError::PatchParse { .. } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("parse_patch_response")
                .with_message(err.to_string()),

            VibeError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
            }
        }
    }
}

/// Conversion from serde_json::Error to VibeError
impl From<serde_json::Error> for VibeError {
    fn from(err: serde_json::Error) -> Self {
        VibeError::Serialization {
            message: err.to_string(),
        }
    }
}
