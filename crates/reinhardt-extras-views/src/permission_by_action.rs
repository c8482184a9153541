//! Permissions chosen by view action

use reinhardt_extras_core::Permission;
use reinhardt_extras_core::permissions::AllowAny;
use std::sync::Arc;

/// Entry name used when no entry lists the current action.
pub const DEFAULT_ACTION: &str = "default";

/// Ordered action-tuple to permission-list table.
///
/// The first entry listing an action wins. An action with no entry, or
/// whose entry is empty, uses the `default` entry.
///
/// # Examples
///
/// ```
/// use reinhardt_extras_core::permissions::{AllowAny, IsAdminUser, IsAuthenticated};
/// use reinhardt_extras_views::PermissionByAction;
///
/// let permissions = PermissionByAction::new()
///     .action("retrieve", [AllowAny])
///     .actions(["list", "create", "destroy"], [IsAdminUser])
///     .default_permissions([IsAuthenticated]);
///
/// assert!(permissions.permissions_for("update").is_none());
/// assert_eq!(permissions.get_permissions("update").len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct PermissionByAction {
	entries: Vec<(Vec<String>, Vec<Arc<dyn Permission>>)>,
}

impl Default for PermissionByAction {
	/// Every action allowed.
	fn default() -> Self {
		Self::new().default_permissions([AllowAny])
	}
}

impl PermissionByAction {
	/// An empty table.
	pub fn new() -> Self {
		Self {
			entries: Vec::new(),
		}
	}

	pub fn actions<A, S, P, I>(mut self, actions: A, permissions: I) -> Self
	where
		A: IntoIterator<Item = S>,
		S: Into<String>,
		P: Permission + 'static,
		I: IntoIterator<Item = P>,
	{
		let permissions = permissions
			.into_iter()
			.map(|permission| Arc::new(permission) as Arc<dyn Permission>)
			.collect();
		self.entries
			.push((actions.into_iter().map(Into::into).collect(), permissions));
		self
	}

	pub fn action<P, I>(self, action: impl Into<String>, permissions: I) -> Self
	where
		P: Permission + 'static,
		I: IntoIterator<Item = P>,
	{
		self.actions([action.into()], permissions)
	}

	/// Entry with mixed permission types.
	pub fn action_dyn<A, S>(mut self, actions: A, permissions: Vec<Arc<dyn Permission>>) -> Self
	where
		A: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.entries
			.push((actions.into_iter().map(Into::into).collect(), permissions));
		self
	}

	pub fn default_permissions<P, I>(self, permissions: I) -> Self
	where
		P: Permission + 'static,
		I: IntoIterator<Item = P>,
	{
		self.action(DEFAULT_ACTION, permissions)
	}

	/// The entry listing `action`, if any.
	pub fn permissions_for(&self, action: &str) -> Option<&[Arc<dyn Permission>]> {
		self.entries
			.iter()
			.find(|(actions, _)| actions.iter().any(|a| a == action))
			.map(|(_, permissions)| permissions.as_slice())
	}

	/// Permissions for `action`, falling back to the `default` entry.
	pub fn get_permissions(&self, action: &str) -> Vec<Arc<dyn Permission>> {
		match self.permissions_for(action) {
			Some(permissions) if !permissions.is_empty() => permissions.to_vec(),
			_ => self
				.permissions_for(DEFAULT_ACTION)
				.map(<[_]>::to_vec)
				.unwrap_or_default(),
		}
	}
}
