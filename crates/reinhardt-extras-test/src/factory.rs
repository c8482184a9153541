//! Request factory for creating test requests
//!
//! Similar to DRF's APIRequestFactory

use http::Method;
use reinhardt_extras_core::{Request, Result, User};

/// Default host of requests built by [`RequestFactory`].
pub const TEST_SERVER: &str = "http://testserver";

/// Factory for creating test requests
#[derive(Debug, Clone)]
pub struct RequestFactory {
	base_url: String,
	user: Option<User>,
}

impl Default for RequestFactory {
	fn default() -> Self {
		Self {
			base_url: TEST_SERVER.to_string(),
			user: None,
		}
	}
}

impl RequestFactory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	/// Authenticate every request built from this factory.
	pub fn with_user(mut self, user: User) -> Self {
		self.user = Some(user);
		self
	}

	/// Create a GET request
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_extras_test::RequestFactory;
	///
	/// let request = RequestFactory::new().get("/foo/1/?fields=id").unwrap();
	/// assert_eq!(request.build_absolute_uri(), "http://testserver/foo/1/?fields=id");
	/// ```
	pub fn get(&self, path: &str) -> Result<Request> {
		self.request(Method::GET, path)
	}

	pub fn post(&self, path: &str) -> Result<Request> {
		self.request(Method::POST, path)
	}

	pub fn patch(&self, path: &str) -> Result<Request> {
		self.request(Method::PATCH, path)
	}

	pub fn request(&self, method: Method, path: &str) -> Result<Request> {
		let request = Request::new(method, &format!("{}{}", self.base_url, path))?;
		Ok(match &self.user {
			Some(user) => request.with_user(user.clone()),
			None => request,
		})
	}
}
