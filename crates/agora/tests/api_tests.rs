//! HTTP API tests against an in-memory application

use axum::{
	Router,
	body::Body,
	http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use agora::AppBuilder;
use agora::auth::{ADMIN_HEADER, GROUPS_HEADER, SITE_HEADER, USER_HEADER};
use agora_core::global_settings::GlobalSettings;

#[derive(Clone, Copy)]
enum As {
	Anonymous,
	Member(&'static str),
	Admin,
}

fn router() -> Router {
	let mut builder = AppBuilder::new();
	builder.globals(GlobalSettings::new());
	let app = builder.build().expect("Failed to build app");
	agora::routes::init(app)
}

async fn call(router: &Router, who: As, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
	let mut req = Request::builder().method(method).uri(uri);
	match who {
		As::Anonymous => {}
		As::Member(groups) => {
			req = req.header(USER_HEADER, "7").header(GROUPS_HEADER, groups);
		}
		As::Admin => {
			req = req.header(USER_HEADER, "1").header(ADMIN_HEADER, "true").header(GROUPS_HEADER, "1,3");
		}
	}
	let req = match body {
		Some(body) => req.header("content-type", "application/json").body(Body::from(body.to_string())),
		None => req.body(Body::empty()),
	}
	.unwrap();

	let res = router.clone().oneshot(req).await.unwrap();
	let status = res.status();
	let bytes = res.into_body().collect().await.unwrap().to_bytes();
	let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
	(status, value)
}

fn names(list: &Value) -> Vec<&str> {
	list["data"].as_array().unwrap().iter().map(|c| c["name"].as_str().unwrap()).collect()
}

// Site settings //
//***************//
#[tokio::test]
async fn test_client_settings() {
	let router = router();
	let (status, body) = call(&router, As::Anonymous, Method::GET, "/site_settings", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["title"], "Agora");
	assert_eq!(body["top_menu"], "latest|new|unread|categories");
	assert!(body.get("api_secret").is_none());
	assert!(body.get("max_users").is_none());
}

#[tokio::test]
async fn test_override_and_revert() {
	let router = router();

	let (status, body) =
		call(&router, As::Admin, Method::PUT, "/admin/site_settings/title", Some(json!({ "value": "Town Hall" })))
			.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["data"]["value"], "Town Hall");

	let (_, body) = call(&router, As::Anonymous, Method::GET, "/site_settings", None).await;
	assert_eq!(body["title"], "Town Hall");

	let (status, body) = call(&router, As::Admin, Method::DELETE, "/admin/site_settings/title", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["data"]["value"], "Agora");

	let (_, body) = call(&router, As::Anonymous, Method::GET, "/site_settings", None).await;
	assert_eq!(body["title"], "Agora");
}

#[tokio::test]
async fn test_invalid_and_unknown_settings() {
	let router = router();

	let (status, body) =
		call(&router, As::Admin, Method::PUT, "/admin/site_settings/max_users", Some(json!({ "value": "many" })))
			.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["code"], "E-INVALID");

	let (status, body) =
		call(&router, As::Admin, Method::PUT, "/admin/site_settings/no_such_thing", Some(json!({ "value": 1 })))
			.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["code"], "E-SETTING");
}

#[tokio::test]
async fn test_settings_admin_only() {
	let router = router();
	let update = Some(json!({ "value": "Mine" }));

	let (status, _) = call(&router, As::Anonymous, Method::PUT, "/admin/site_settings/title", update.clone()).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	let (status, _) = call(&router, As::Member("3"), Method::PUT, "/admin/site_settings/title", update).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	let (status, _) = call(&router, As::Member("3"), Method::GET, "/admin/site_settings", None).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_listing_hides_hidden_settings() {
	let router = router();
	let (status, body) = call(&router, As::Admin, Method::GET, "/admin/site_settings", None).await;
	assert_eq!(status, StatusCode::OK);

	let listed: Vec<&str> =
		body["data"].as_array().unwrap().iter().map(|s| s["setting"].as_str().unwrap()).collect();
	assert!(listed.contains(&"max_users"));
	assert!(listed.contains(&"fixed_category_positions"));
	assert!(!listed.contains(&"experimental_flag"));
}

#[tokio::test]
async fn test_sites_are_isolated() {
	let router = router();
	let req = Request::builder()
		.method(Method::PUT)
		.uri("/admin/site_settings/title")
		.header(USER_HEADER, "1")
		.header(ADMIN_HEADER, "1")
		.header(SITE_HEADER, "2")
		.header("content-type", "application/json")
		.body(Body::from(json!({ "value": "Second" }).to_string()))
		.unwrap();
	assert_eq!(router.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

	let (_, body) = call(&router, As::Anonymous, Method::GET, "/site_settings", None).await;
	assert_eq!(body["title"], "Agora");
}

// Categories //
//************//
#[tokio::test]
async fn test_restricted_category_visibility() {
	let router = router();

	let (status, _) =
		call(&router, As::Admin, Method::POST, "/categories", Some(json!({ "name": "General" }))).await;
	assert_eq!(status, StatusCode::CREATED);
	let (status, body) = call(
		&router,
		As::Admin,
		Method::POST,
		"/categories",
		Some(json!({ "name": "Staff Room", "permissions": { "staff": "full" } })),
	)
	.await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(body["data"]["readRestricted"], true);
	assert_eq!(body["data"]["slug"], "staff-room");
	assert_eq!(body["data"]["permissions"], json!({ "staff": "full" }));
	let staff_id = body["data"]["id"].as_i64().unwrap();

	let (_, list) = call(&router, As::Anonymous, Method::GET, "/categories", None).await;
	assert_eq!(names(&list), vec!["General"]);
	let (_, list) = call(&router, As::Member("11"), Method::GET, "/categories", None).await;
	assert_eq!(names(&list), vec!["General"]);
	let (_, list) = call(&router, As::Member("3,11"), Method::GET, "/categories", None).await;
	assert_eq!(names(&list), vec!["General", "Staff Room"]);

	let uri = format!("/categories/{}", staff_id);
	let (status, _) = call(&router, As::Anonymous, Method::GET, &uri, None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	let (status, body) = call(&router, As::Member("3"), Method::GET, &uri, None).await;
	assert_eq!(status, StatusCode::OK);
	assert!(body["data"].get("permissions").is_none());
}

#[tokio::test]
async fn test_subcategory_permission_conflict() {
	let router = router();

	let (_, body) = call(
		&router,
		As::Admin,
		Method::POST,
		"/categories",
		Some(json!({ "name": "Staff", "groupNames": ["staff"] })),
	)
	.await;
	let parent_id = body["data"]["id"].as_i64().unwrap();

	// Open child below a staff-only parent
	let (status, body) = call(
		&router,
		As::Admin,
		Method::POST,
		"/categories",
		Some(json!({ "name": "Open", "parentCategoryId": parent_id, "permissions": { "everyone": "full" } })),
	)
	.await;
	assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
	assert!(body["message"].as_str().unwrap().contains("permission_conflict"));

	let (status, _) = call(
		&router,
		As::Admin,
		Method::POST,
		"/categories",
		Some(json!({ "name": "Staff Notes", "parentCategoryId": parent_id, "permissions": { "staff": "readonly" } })),
	)
	.await;
	assert_eq!(status, StatusCode::CREATED);

	// Parents with subcategories cannot be deleted
	let (status, body) =
		call(&router, As::Admin, Method::DELETE, &format!("/categories/{}", parent_id), None).await;
	assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
	assert!(body["message"].as_str().unwrap().contains("has_subcategories"));

	let (_, list) = call(&router, As::Admin, Method::GET, "/categories", None).await;
	assert_eq!(names(&list), vec!["Staff", "Staff Notes"]);
}

#[tokio::test]
async fn test_category_update_and_delete() {
	let router = router();

	let (_, body) =
		call(&router, As::Admin, Method::POST, "/categories", Some(json!({ "name": "Lounge" }))).await;
	let uri = format!("/categories/{}", body["data"]["id"].as_i64().unwrap());

	let (status, body) = call(
		&router,
		As::Admin,
		Method::PUT,
		&uri,
		Some(json!({ "permissions": { "trust_level_2": "create_post", "everyone": "readonly" } })),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["data"]["name"], "Lounge");
	assert_eq!(body["data"]["readRestricted"], false);
	assert_eq!(body["data"]["permissions"], json!({ "everyone": "readonly", "trust_level_2": "create_post" }));

	let (status, _) = call(&router, As::Member("3"), Method::DELETE, &uri, None).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	let (status, _) = call(&router, As::Admin, Method::DELETE, &uri, None).await;
	assert_eq!(status, StatusCode::NO_CONTENT);
	let (status, _) = call(&router, As::Admin, Method::GET, &uri, None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_unknown_group() {
	let router = router();
	let (status, _) = call(
		&router,
		As::Admin,
		Method::POST,
		"/categories",
		Some(json!({ "name": "Design", "permissions": { "designers": "full" } })),
	)
	.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (status, body) =
		call(&router, As::Admin, Method::POST, "/admin/groups", Some(json!({ "name": "designers" }))).await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(body["data"]["id"], 100);

	let (status, body) = call(
		&router,
		As::Admin,
		Method::POST,
		"/categories",
		Some(json!({ "name": "Design", "permissions": { "designers": "full" } })),
	)
	.await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(body["data"]["permissions"], json!({ "designers": "full" }));

	let (_, list) = call(&router, As::Member("100"), Method::GET, "/categories", None).await;
	assert_eq!(names(&list), vec!["Design"]);
}

#[tokio::test]
async fn test_fixed_category_positions() {
	let router = router();
	for (name, position) in [("Zebra", 0), ("Apple", 1)] {
		call(&router, As::Admin, Method::POST, "/categories", Some(json!({ "name": name, "position": position })))
			.await;
	}

	let (_, list) = call(&router, As::Anonymous, Method::GET, "/categories", None).await;
	assert_eq!(names(&list), vec!["Apple", "Zebra"]);

	call(
		&router,
		As::Admin,
		Method::PUT,
		"/admin/site_settings/fixed_category_positions",
		Some(json!({ "value": true })),
	)
	.await;
	let (_, list) = call(&router, As::Anonymous, Method::GET, "/categories", None).await;
	assert_eq!(names(&list), vec!["Zebra", "Apple"]);
}

// vim: ts=4
