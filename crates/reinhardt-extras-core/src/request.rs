//! Request collaborator
//!
//! The slice of an HTTP request the serializer layer needs: method, absolute
//! URL with query parameters, and the authenticated user.

use http::Method;
use indexmap::IndexMap;
use serde_json::Value;
use url::{Url, form_urlencoded};

use crate::exception::Result;

/// An authenticated user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
	pub id: Value,
	pub username: String,
	pub is_active: bool,
	pub is_staff: bool,
	pub is_superuser: bool,
	pub permissions: Vec<String>,
}

impl User {
	pub fn new(id: impl Into<Value>, username: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			username: username.into(),
			is_active: true,
			is_staff: false,
			is_superuser: false,
			permissions: Vec::new(),
		}
	}

	pub fn staff(mut self) -> Self {
		self.is_staff = true;
		self
	}

	pub fn superuser(mut self) -> Self {
		self.is_staff = true;
		self.is_superuser = true;
		self
	}

	pub fn inactive(mut self) -> Self {
		self.is_active = false;
		self
	}

	pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
		self.permissions.push(permission.into());
		self
	}

	/// Active superusers hold every permission.
	pub fn has_perm(&self, permission: &str) -> bool {
		self.is_active && (self.is_superuser || self.permissions.iter().any(|p| p == permission))
	}
}

/// An incoming request as seen by views and serializers.
#[derive(Debug, Clone)]
pub struct Request {
	method: Method,
	url: Url,
	user: Option<User>,
}

impl Request {
	/// Build a request from an absolute URL.
	pub fn new(method: Method, url: &str) -> Result<Self> {
		Ok(Self {
			method,
			url: Url::parse(url)?,
			user: None,
		})
	}

	pub fn get(url: &str) -> Result<Self> {
		Self::new(Method::GET, url)
	}

	pub fn with_user(mut self, user: User) -> Self {
		self.user = Some(user);
		self
	}

	pub fn method(&self) -> &Method {
		&self.method
	}

	pub fn url(&self) -> &Url {
		&self.url
	}

	pub fn user(&self) -> Option<&User> {
		self.user.as_ref()
	}

	/// `GET`, `HEAD` and `OPTIONS` do not modify state.
	pub fn is_safe_method(&self) -> bool {
		matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
	}

	/// Decoded query parameters. A repeated key keeps its first position and
	/// its last value.
	pub fn query_params(&self) -> IndexMap<String, String> {
		let mut params = IndexMap::new();
		for (key, value) in self.url.query_pairs() {
			params.insert(key.into_owned(), value.into_owned());
		}
		params
	}

	pub fn query_param(&self, key: &str) -> Option<String> {
		self.url
			.query_pairs()
			.filter(|(k, _)| k == key)
			.last()
			.map(|(_, v)| v.into_owned())
	}

	/// The full URL of this request.
	pub fn build_absolute_uri(&self) -> String {
		self.url.to_string()
	}
}

fn segment_key(segment: &str) -> Option<String> {
	form_urlencoded::parse(segment.as_bytes())
		.next()
		.map(|(key, _)| key.into_owned())
}

/// Replace (or append) one query parameter of `url`.
///
/// Every other query segment is kept byte-for-byte and in its original
/// position. Repeated occurrences of `key` collapse into one.
///
/// # Examples
///
/// ```
/// use reinhardt_extras_core::request::replace_query_param;
///
/// let url = "http://testserver/foo/?fields[bars]=id&fields[foes]=id";
/// let next = replace_query_param(url, "fields[foes]", "id,page(2)").unwrap();
/// assert_eq!(
///     next,
///     "http://testserver/foo/?fields[bars]=id&fields%5Bfoes%5D=id%2Cpage%282%29"
/// );
/// ```
pub fn replace_query_param(url: &str, key: &str, value: &str) -> Result<String> {
	let mut parsed = Url::parse(url)?;
	let encoded = form_urlencoded::Serializer::new(String::new())
		.append_pair(key, value)
		.finish();
	let mut segments: Vec<String> = Vec::new();
	let mut replaced = false;
	if let Some(query) = parsed.query() {
		for segment in query.split('&').filter(|s| !s.is_empty()) {
			if segment_key(segment).as_deref() == Some(key) {
				if !replaced {
					segments.push(encoded.clone());
					replaced = true;
				}
				continue;
			}
			segments.push(segment.to_string());
		}
	}
	if !replaced {
		segments.push(encoded);
	}
	parsed.set_query(Some(&segments.join("&")));
	Ok(parsed.to_string())
}

/// Remove every occurrence of one query parameter, keeping the rest intact.
pub fn remove_query_param(url: &str, key: &str) -> Result<String> {
	let mut parsed = Url::parse(url)?;
	let segments: Vec<String> = parsed
		.query()
		.unwrap_or_default()
		.split('&')
		.filter(|s| !s.is_empty() && segment_key(s).as_deref() != Some(key))
		.map(str::to_string)
		.collect();
	if segments.is_empty() {
		parsed.set_query(None);
	} else {
		parsed.set_query(Some(&segments.join("&")));
	}
	Ok(parsed.to_string())
}
