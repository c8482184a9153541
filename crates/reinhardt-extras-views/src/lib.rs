//! # Reinhardt Extras Views
//!
//! View composition for the reinhardt-extras serializers: `?fields=`
//! narrowing, querysets annotated with exactly the annotations being
//! rendered, `?fields[<relation>]=` embedding and permissions chosen per
//! action. Failures are rendered as `{"detail": <message>}` with the
//! error's status code.

pub mod actions;
pub mod permission_by_action;
pub mod response;
pub mod viewset;

pub use actions::Action;
pub use permission_by_action::{DEFAULT_ACTION, PermissionByAction};
pub use response::Response;
pub use viewset::{ModelViewSet, QuerySetFactory};
