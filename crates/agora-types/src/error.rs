//! Error type shared by all Agora crates

use axum::{Json, http::StatusCode, response::IntoResponse};

pub type ClResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	NotFound,
	PermissionDenied,
	DbError,
	Parse,

	/// A value was rejected by coercion or a validator. Carries the message
	/// that is shown to the caller.
	InvalidParameters(String),
	/// `set` was called with a name that was never registered
	UnknownSetting(String),
	/// Model-level validation failed (e.g. category permission conflict)
	ValidationError(String),
	ConfigError(String),
	Internal(String),

	// externals
	Io(std::io::Error),
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		tracing::warn!("JSON error: {}", err);
		Self::Parse
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Error::NotFound => write!(f, "not found"),
			Error::PermissionDenied => write!(f, "permission denied"),
			Error::DbError => write!(f, "database error"),
			Error::Parse => write!(f, "parse error"),
			Error::InvalidParameters(msg) => write!(f, "invalid parameters: {}", msg),
			Error::UnknownSetting(name) => write!(
				f,
				"Either no setting named '{}' exists or value provided is invalid",
				name
			),
			Error::ValidationError(msg) => write!(f, "validation failed: {}", msg),
			Error::ConfigError(msg) => write!(f, "configuration error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
			Error::Io(err) => write!(f, "io error: {}", err),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Io(err) => Some(err),
			_ => None,
		}
	}
}

#[derive(serde::Serialize)]
struct ErrorBody<'a> {
	code: &'a str,
	message: String,
}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		let (status, code) = match &self {
			Error::NotFound => (StatusCode::NOT_FOUND, "E-NOTFOUND"),
			Error::PermissionDenied => (StatusCode::FORBIDDEN, "E-PERM"),
			Error::InvalidParameters(_) => (StatusCode::BAD_REQUEST, "E-INVALID"),
			Error::UnknownSetting(_) => (StatusCode::BAD_REQUEST, "E-SETTING"),
			Error::Parse => (StatusCode::BAD_REQUEST, "E-PARSE"),
			Error::ValidationError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "E-VALIDATION"),
			Error::DbError
			| Error::ConfigError(_)
			| Error::Internal(_)
			| Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "E-INTERNAL"),
		};
		let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
			tracing::error!("{}", self);
			"internal server error".to_string()
		} else {
			self.to_string()
		};

		(status, Json(ErrorBody { code, message })).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unknown_setting_message() {
		let err = Error::UnknownSetting("max_users".into());
		assert!(err.to_string().contains("'max_users'"));
	}

	#[test]
	fn test_status_codes() {
		assert_eq!(Error::NotFound.into_response().status(), StatusCode::NOT_FOUND);
		assert_eq!(
			Error::InvalidParameters("value".into()).into_response().status(),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(
			Error::ValidationError("permission_conflict".into()).into_response().status(),
			StatusCode::UNPROCESSABLE_ENTITY
		);
		assert_eq!(Error::DbError.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
	}
}

// vim: ts=4
