//! Integration tests for model view sets
//!
//! Tests whole requests: query parameters in, status and body out, with
//! the number of queries each request costs.

use reinhardt_extras::core::permissions::{AllowAny, IsAuthenticated};
use reinhardt_extras::{Action, ExtrasSettings, ModelViewSet, PermissionByAction, User};
use reinhardt_extras_test::{MemoryDatabase, RequestFactory};
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::fixtures::{
	OwnerWorld, TaggedWorld, many_serializer, owner_serializer, owner_world, tagged_world,
};

fn owner_view(db: &Arc<MemoryDatabase>) -> ModelViewSet {
	let db = db.clone();
	ModelViewSet::new("owner", owner_serializer(), move || db.objects("Owner"))
		.with_dynamic_fields()
		.with_annotations()
		.with_related_objects()
}

fn many_view(db: &Arc<MemoryDatabase>) -> ModelViewSet {
	let db = db.clone();
	ModelViewSet::new("many", many_serializer(), move || db.objects("Many"))
		.with_dynamic_fields()
		.with_annotations()
}

fn retrieve(view: &ModelViewSet, path: &str, pk: i64) -> (u16, Value) {
	let request = RequestFactory::new().get(path).unwrap();
	let response = view.dispatch(request, Action::Retrieve, Some(json!(pk)));
	(response.status.as_u16(), response.data)
}

/// Test a selected collection below the page size renders as a bare list
#[rstest]
fn test_filtered_collection_without_envelope(owner_world: OwnerWorld) {
	// Arrange
	let view = owner_view(&owner_world.db);

	// Act
	let (status, data) = retrieve(&view, "/owners/1/?fields=id,foes&fields[foes]=id", owner_world.owner);

	// Assert
	let expected: Vec<Value> = owner_world
		.matching
		.iter()
		.map(|id| json!({"id": id}))
		.collect();
	assert_eq!(status, 200);
	assert_eq!(data, json!({"id": owner_world.owner, "foes": expected}));
}

/// Test an injected page size paginates the collection
#[rstest]
fn test_page_size_token_paginates(owner_world: OwnerWorld) {
	// Arrange
	let view = owner_view(&owner_world.db);
	owner_world.db.reset_queries();

	// Act
	let (status, data) = retrieve(
		&view,
		"/owners/1/?fields=id,foes&fields[foes]=id,page_size(1)",
		owner_world.owner,
	);

	// Assert
	assert_eq!(status, 200);
	assert_eq!(
		data["foes"],
		json!({
			"count": 3,
			"next": "http://testserver/owners/1/?fields=id,foes&fields%5Bfoes%5D=id%2Cpage_size%281%29%2Cpage%282%29",
			"previous": null,
			"results": [{"id": owner_world.matching[0]}],
		})
	);
	// The owner, the count of matching foes, then one page of them
	assert_eq!(owner_world.db.query_count(), 3);
}

/// Test paginating one relation leaves the other relation's parameter intact
#[rstest]
fn test_links_rewrite_only_their_own_relation(owner_world: OwnerWorld) {
	// Arrange
	let view = owner_view(&owner_world.db);
	let path = "/owners/1/?fields=id,foes,bars&fields[foes]=id,page_size(1)&fields[bars]=id,page_size(1)";

	// Act
	let (status, data) = retrieve(&view, path, owner_world.owner);

	// Assert
	assert_eq!(status, 200);
	assert_eq!(
		data["foes"]["next"],
		json!(
			"http://testserver/owners/1/?fields=id,foes,bars&fields%5Bfoes%5D=id%2Cpage_size%281%29%2Cpage%282%29&fields[bars]=id,page_size(1)"
		)
	);
	assert_eq!(
		data["bars"]["next"],
		json!(
			"http://testserver/owners/1/?fields=id,foes,bars&fields[foes]=id,page_size(1)&fields%5Bbars%5D=id%2Cpage_size%281%29%2Cpage%282%29"
		)
	);
	assert_eq!(data["bars"]["count"], json!(2));
}

/// Test the link back to page 1 carries no page token
#[rstest]
fn test_previous_link_to_first_page_drops_page_token(owner_world: OwnerWorld) {
	// Arrange
	let view = owner_view(&owner_world.db);

	// Act
	let (status, data) = retrieve(
		&view,
		"/owners/1/?fields=foes&fields[foes]=id,page_size(1),page(2)",
		owner_world.owner,
	);

	// Assert
	assert_eq!(status, 200);
	assert_eq!(
		data["foes"],
		json!({
			"count": 3,
			"next": "http://testserver/owners/1/?fields=foes&fields%5Bfoes%5D=id%2Cpage_size%281%29%2Cpage%283%29",
			"previous": "http://testserver/owners/1/?fields=foes&fields%5Bfoes%5D=id%2Cpage_size%281%29",
			"results": [{"id": owner_world.matching[1]}],
		})
	);
}

/// Test requesting page 1 explicitly renders the same page as omitting it
#[rstest]
fn test_explicit_first_page_matches_default(owner_world: OwnerWorld) {
	// Arrange
	let view = owner_view(&owner_world.db);

	// Act
	let (_, implicit) = retrieve(
		&view,
		"/owners/1/?fields=foes&fields[foes]=id,page_size(1)",
		owner_world.owner,
	);
	let (_, explicit) = retrieve(
		&view,
		"/owners/1/?fields=foes&fields[foes]=id,page_size(1),page(1)",
		owner_world.owner,
	);

	// Assert
	assert_eq!(explicit["foes"]["count"], implicit["foes"]["count"]);
	assert_eq!(explicit["foes"]["results"], implicit["foes"]["results"]);
	assert_eq!(explicit["foes"]["previous"], Value::Null);
}

/// Test invalid pages are not found, naming the relation
#[rstest]
#[case("id,page(4),page_size(1)", "Invalid page for `foes`.")]
#[case("id,page(0)", "Invalid page for `foes`.")]
#[case("id,page_size(0)", "Invalid page size for `foes`.")]
fn test_invalid_page_is_not_found(
	owner_world: OwnerWorld,
	#[case] selection: &str,
	#[case] detail: &str,
) {
	// Arrange
	let view = owner_view(&owner_world.db);
	let path = format!("/owners/1/?fields=foes&fields[foes]={}", selection);

	// Act
	let (status, data) = retrieve(&view, &path, owner_world.owner);

	// Assert
	assert_eq!(status, 404);
	assert_eq!(data, json!({"detail": detail}));
}

/// Test a denied relation answers 403 without leaking the related object
#[rstest]
fn test_denied_relation_is_forbidden(owner_world: OwnerWorld) {
	// Arrange
	let view = owner_view(&owner_world.db);

	// Act
	let (status, data) = retrieve(
		&view,
		"/owners/1/?fields=id,foo&fields[foo]=id,bar",
		owner_world.owner,
	);

	// Assert
	assert_eq!(status, 403);
	assert_eq!(
		data,
		json!({"detail": "You do not have permission to access the related object `foo`."})
	);
}

/// Test an authenticated user sees the related object
#[rstest]
fn test_authenticated_user_sees_relation(owner_world: OwnerWorld) {
	// Arrange
	let view = owner_view(&owner_world.db);
	let request = RequestFactory::new()
		.with_user(User::new(1, "alice"))
		.get("/owners/1/?fields=id,foo&fields[foo]=id,bar")
		.unwrap();

	// Act
	let response = view.dispatch(request, Action::Retrieve, Some(json!(owner_world.owner)));

	// Assert
	assert!(response.is_success());
	assert_eq!(
		response.data,
		json!({"id": owner_world.owner, "foo": {"id": owner_world.foo, "bar": "test"}})
	);
}

/// Test the configured related page size applies without a page size token
#[rstest]
fn test_settings_page_size(owner_world: OwnerWorld) {
	// Arrange
	let settings = ExtrasSettings::default().related_object_page_size(2);
	let view = owner_view(&owner_world.db).with_settings(Arc::new(settings));

	// Act
	let (status, data) = retrieve(&view, "/owners/1/?fields=foes&fields[foes]=id", owner_world.owner);

	// Assert
	assert_eq!(status, 200);
	assert_eq!(data["foes"]["count"], json!(3));
	assert_eq!(
		data["foes"]["results"],
		json!([{"id": owner_world.matching[0]}, {"id": owner_world.matching[1]}])
	);
}

/// Test an annotated retrieve costs a single query
#[rstest]
fn test_annotated_retrieve_is_one_query(tagged_world: TaggedWorld) {
	// Arrange
	let view = many_view(&tagged_world.db);
	tagged_world.db.reset_queries();

	// Act
	let (status, data) = retrieve(&view, "/many/1/", tagged_world.many);

	// Assert
	assert_eq!(status, 200);
	assert_eq!(data["count_foo"], json!(6));
	assert_eq!(data["complex_foo"], json!(13));
	assert_eq!(data["list_foo"], json!({"test_1": 2, "test_2": 1, "test_3": 3}));
	assert_eq!(tagged_world.db.query_count(), 1);
}

/// Test the queryset is annotated only with annotations that will render
#[rstest]
fn test_narrowed_retrieve_annotates_selected_only(tagged_world: TaggedWorld) {
	// Arrange
	let view = many_view(&tagged_world.db);
	tagged_world.db.reset_queries();

	// Act
	let (status, data) = retrieve(&view, "/many/1/?fields=id,count_foo", tagged_world.many);

	// Assert
	assert_eq!(status, 200);
	assert_eq!(data, json!({"id": tagged_world.many, "count_foo": 6}));
	let queries = tagged_world.db.queries();
	assert_eq!(queries.len(), 1);
	assert!(queries[0].ends_with("ANNOTATE _annotated_count_foo"));
}

/// Test a named field group narrows a list
#[rstest]
fn test_list_with_field_group(owner_world: OwnerWorld) {
	// Arrange
	let view = owner_view(&owner_world.db);
	let request = RequestFactory::new().get("/owners/?fields=@min").unwrap();

	// Act
	let response = view.dispatch(request, Action::List, None);

	// Assert
	assert!(response.is_success());
	assert_eq!(response.data, json!([{"id": owner_world.owner}]));
}

/// Test view permissions resolved per action
#[rstest]
#[case(Action::List, None, 200)]
#[case(Action::Retrieve, None, 403)]
#[case(Action::Retrieve, Some(User::new(1, "alice")), 200)]
fn test_permission_by_action(
	owner_world: OwnerWorld,
	#[case] action: Action,
	#[case] user: Option<User>,
	#[case] status: u16,
) {
	// Arrange
	let permissions = PermissionByAction::new()
		.default_permissions([AllowAny])
		.action("retrieve", [IsAuthenticated]);
	let view = owner_view(&owner_world.db).with_permissions(permissions);
	let factory = match user {
		Some(user) => RequestFactory::new().with_user(user),
		None => RequestFactory::new(),
	};
	let request = factory.get("/owners/1/?fields=id").unwrap();

	// Act
	let response = view.dispatch(request, action, Some(json!(owner_world.owner)));

	// Assert
	assert_eq!(response.status.as_u16(), status);
	if status == 403 {
		assert_eq!(
			response.data,
			json!({"detail": "You do not have permission to perform this action."})
		);
	}
}
