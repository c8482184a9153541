//! Permission classes
//!
//! Permissions answer two questions: may this request proceed at all
//! (`has_permission`), and may it touch this particular object
//! (`has_object_permission`). Both default to allowing access.

use std::fmt;

use crate::orm::Instance;
use crate::request::{Request, User};

/// What a permission check gets to look at.
pub struct PermissionContext<'a> {
	pub request: &'a Request,
	pub is_authenticated: bool,
	pub is_admin: bool,
	pub is_active: bool,
	pub user: Option<&'a User>,
}

impl<'a> PermissionContext<'a> {
	pub fn from_request(request: &'a Request) -> Self {
		let user = request.user();
		Self {
			request,
			is_authenticated: user.is_some(),
			is_admin: user.is_some_and(|u| u.is_staff),
			is_active: user.is_some_and(|u| u.is_active),
			user,
		}
	}
}

pub trait Permission: Send + Sync {
	fn has_permission(&self, _context: &PermissionContext<'_>) -> bool {
		true
	}

	fn has_object_permission(&self, _context: &PermissionContext<'_>, _obj: &dyn Instance) -> bool {
		true
	}

	/// Type name, for diagnostics.
	fn name(&self) -> &'static str {
		std::any::type_name::<Self>()
	}
}

impl fmt::Debug for dyn Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Both checks of one permission must pass.
pub fn check_object<P: Permission + ?Sized>(
	permission: &P,
	context: &PermissionContext<'_>,
	obj: &dyn Instance,
) -> bool {
	permission.has_permission(context) && permission.has_object_permission(context, obj)
}

/// Allow any request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAny;

impl Permission for AllowAny {}

/// Require an authenticated, active user.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAuthenticated;

impl Permission for IsAuthenticated {
	fn has_permission(&self, context: &PermissionContext<'_>) -> bool {
		context.is_authenticated && context.is_active
	}
}

/// Require a staff user.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAdminUser;

impl Permission for IsAdminUser {
	fn has_permission(&self, context: &PermissionContext<'_>) -> bool {
		context.is_authenticated && context.is_admin
	}
}

/// Staff users may do anything, everyone else may only read.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAdminOrReadOnly;

impl Permission for IsAdminOrReadOnly {
	fn has_permission(&self, context: &PermissionContext<'_>) -> bool {
		context.request.is_safe_method() || context.is_admin
	}
}

/// Only the object's creator may modify it; anyone may read it.
///
/// The creator is read from the object's `creator` attribute and compared
/// with the request user's id.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsCreator;

impl Permission for IsCreator {
	fn has_object_permission(&self, context: &PermissionContext<'_>, obj: &dyn Instance) -> bool {
		if context.request.is_safe_method() {
			return true;
		}
		match (context.user, obj.attribute("creator")) {
			(Some(user), Some(creator)) => creator == user.id,
			_ => false,
		}
	}
}

/// Require a named permission on the user.
#[derive(Debug, Clone)]
pub struct HasPermission {
	permission: String,
}

impl HasPermission {
	pub fn new(permission: impl Into<String>) -> Self {
		Self {
			permission: permission.into(),
		}
	}
}

impl Permission for HasPermission {
	fn has_object_permission(&self, context: &PermissionContext<'_>, _obj: &dyn Instance) -> bool {
		context.user.is_some_and(|user| user.has_perm(&self.permission))
	}
}
