//! Error taxonomy shared by every reinhardt-extras crate.
//!
//! Errors fall into three groups: configuration errors raised the first time
//! a misconfigured piece is used, client-facing errors (`NotFound`,
//! `PermissionDenied`, `Validation`) that views turn into responses, and
//! collaborator failures that are propagated unchanged.

use thiserror::Error;

/// Result type for reinhardt-extras operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
	/// A serializer, view or registry is wired up incorrectly.
	#[error("Improperly configured: {0}")]
	ImproperlyConfigured(String),

	/// The requested resource (object, page) does not exist.
	#[error("{0}")]
	NotFound(String),

	/// The current actor may not access the resource.
	#[error("{0}")]
	PermissionDenied(String),

	/// Input data was rejected.
	#[error("{0}")]
	Validation(String),

	/// A field could not coerce a value into its representation.
	#[error("Cannot serialize value for `{field}`: {message}")]
	Serialization { field: String, message: String },

	/// The query collaborator failed.
	#[error("Database error: {0}")]
	Database(String),

	/// A request URL could not be parsed or rebuilt.
	#[error("Invalid URL: {0}")]
	InvalidUrl(String),
}

impl Error {
	/// HTTP status code a view should answer with for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			Error::NotFound(_) => 404,
			Error::PermissionDenied(_) => 403,
			Error::Validation(_) | Error::InvalidUrl(_) => 400,
			Error::ImproperlyConfigured(_) | Error::Serialization { .. } | Error::Database(_) => {
				500
			}
		}
	}

	/// Client-facing message, used as the `detail` of an error response.
	pub fn detail(&self) -> String {
		match self {
			Error::NotFound(msg) | Error::PermissionDenied(msg) | Error::Validation(msg) => {
				msg.clone()
			}
			Error::InvalidUrl(_) => "Bad request.".to_string(),
			_ => "A server error occurred.".to_string(),
		}
	}

	/// Whether the error is a client error (4xx).
	pub fn is_client_error(&self) -> bool {
		(400..500).contains(&self.status_code())
	}
}

impl From<url::ParseError> for Error {
	fn from(err: url::ParseError) -> Self {
		Error::InvalidUrl(err.to_string())
	}
}

impl From<toml::de::Error> for Error {
	fn from(err: toml::de::Error) -> Self {
		Error::ImproperlyConfigured(format!("invalid settings: {}", err))
	}
}
