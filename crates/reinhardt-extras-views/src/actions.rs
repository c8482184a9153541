/// Action type for view operations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
	List,
	Retrieve,
	Create,
	Update,
	PartialUpdate,
	Destroy,
	Custom(String),
}

impl Action {
	/// Map an action name to its [`Action`]. Unknown names become
	/// [`Action::Custom`].
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_extras_views::Action;
	///
	/// assert_eq!(Action::from_name("list"), Action::List);
	/// assert_eq!(Action::from_name("publish"), Action::Custom("publish".to_string()));
	/// ```
	pub fn from_name(name: &str) -> Self {
		match name {
			"list" => Self::List,
			"retrieve" => Self::Retrieve,
			"create" => Self::Create,
			"update" => Self::Update,
			"partial_update" => Self::PartialUpdate,
			"destroy" => Self::Destroy,
			custom => Self::Custom(custom.to_string()),
		}
	}

	pub fn name(&self) -> &str {
		match self {
			Self::List => "list",
			Self::Retrieve => "retrieve",
			Self::Create => "create",
			Self::Update => "update",
			Self::PartialUpdate => "partial_update",
			Self::Destroy => "destroy",
			Self::Custom(name) => name,
		}
	}

	/// Whether the action operates on a single object.
	pub fn is_detail(&self) -> bool {
		matches!(
			self,
			Self::Retrieve | Self::Update | Self::PartialUpdate | Self::Destroy
		)
	}
}
