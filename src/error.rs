use kube::core::ErrorResponse;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Resource not found: {kind} {name} in namespace {namespace}")]
    NotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    #[error("Resource already exists: {kind} {name} in namespace {namespace}")]
    AlreadyExists {
        kind: String,
        name: String,
        namespace: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid patch: {0}")]
    InvalidPatch(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("JSON patch error: {0}")]
    PatchError(#[from] json_patch::PatchError),

    #[error("Failed to access object metadata: {0}")]
    MetadataError(String),

    #[error("No reaction implemented for {verb} on {resource}")]
    NoReaction { verb: String, resource: String },

    /// A literal API status, usually injected by a test reactor
    #[error("API error: {0}")]
    Api(#[from] ErrorResponse),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status code the API server would answer with.
    pub fn code(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::AlreadyExists { .. } | Error::Conflict(_) => 409,
            Error::InvalidRequest(_) | Error::InvalidSelector { .. } | Error::InvalidPatch(_) => {
                400
            }
            Error::PatchError(_) => 422,
            Error::NoReaction { .. } => 405,
            Error::Api(resp) => resp.code,
            Error::SerializationError(_) | Error::MetadataError(_) | Error::Internal(_) => 500,
        }
    }

    /// Machine readable `metav1.StatusReason`.
    pub fn reason(&self) -> &str {
        match self {
            Error::NotFound { .. } => "NotFound",
            Error::AlreadyExists { .. } => "AlreadyExists",
            Error::Conflict(_) => "Conflict",
            Error::InvalidRequest(_) | Error::InvalidSelector { .. } | Error::InvalidPatch(_) => {
                "BadRequest"
            }
            Error::PatchError(_) => "Invalid",
            Error::NoReaction { .. } => "MethodNotAllowed",
            Error::Api(resp) => &resp.reason,
            Error::SerializationError(_) | Error::MetadataError(_) | Error::Internal(_) => {
                "InternalError"
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.reason() == "NotFound"
    }

    pub fn is_already_exists(&self) -> bool {
        self.reason() == "AlreadyExists"
    }

    pub fn is_conflict(&self) -> bool {
        self.reason() == "Conflict"
    }

    pub fn is_bad_request(&self) -> bool {
        self.reason() == "BadRequest"
    }

    /// Render the error the way the API server reports failures.
    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            Error::Api(resp) => resp.clone(),
            other => ErrorResponse {
                status: "Failure".to_string(),
                message: other.to_string(),
                reason: other.reason().to_string(),
                code: other.code(),
            },
        }
    }
}
