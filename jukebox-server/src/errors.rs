use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use jukebox_collab::{DatabaseError, ProviderError, RoomError, TokenError, VoteError};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("Only the host may do this")]
    PermissionDenied,
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Provider(ProviderError),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Provider(e) => match e {
                ProviderError::NoCredential => StatusCode::BAD_REQUEST,
                ProviderError::NothingPlaying => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<RoomError> for ServerError {
    fn from(value: RoomError) -> Self {
        match value {
            RoomError::NotFound(_) => Self::NotFound {
                resource: "room",
                identifier: "code",
            },
            RoomError::PermissionDenied => Self::PermissionDenied,
            RoomError::InvalidSettings(reason) => Self::Validation(reason.to_string()),
            RoomError::Db(e) => e.into(),
        }
    }
}

impl From<VoteError> for ServerError {
    fn from(value: VoteError) -> Self {
        match value {
            VoteError::Db(e) => e.into(),
        }
    }
}

impl From<ProviderError> for ServerError {
    fn from(value: ProviderError) -> Self {
        Self::Provider(value)
    }
}

impl From<TokenError> for ServerError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}
