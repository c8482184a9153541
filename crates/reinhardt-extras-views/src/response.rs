//! View responses

use http::StatusCode;
use reinhardt_extras_core::Error;
use serde_json::{Value, json};

/// A rendered view result: a status and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
	pub status: StatusCode,
	pub data: Value,
}

impl Response {
	pub fn new(status: StatusCode, data: Value) -> Self {
		Self { status, data }
	}

	pub fn ok(data: Value) -> Self {
		Self::new(StatusCode::OK, data)
	}

	/// `{"detail": message}` with the given status.
	pub fn detail(status: StatusCode, message: impl Into<String>) -> Self {
		Self::new(status, json!({ "detail": message.into() }))
	}

	/// Map an error to its status code and `detail` body.
	pub fn from_error(error: &Error) -> Self {
		let status =
			StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		if error.is_client_error() {
			tracing::debug!(status = %status, error = %error, "request rejected");
		} else {
			tracing::warn!(status = %status, error = %error, "request failed");
		}
		Self::detail(status, error.detail())
	}

	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}
}

impl From<Error> for Response {
	fn from(error: Error) -> Self {
		Self::from_error(&error)
	}
}
