use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::authz::REQUESTING_UUID_HEADER;
use crate::{authz, errors, events, models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::schedules::list_schedules,
		routes::schedules::current_schedule,
		routes::schedules::public_schedule,
		routes::schedules::activate_schedule,
		routes::schedules::get_schedule,
		routes::schedules::create_schedule,
		routes::schedules::replace_schedule,
		routes::schedules::patch_schedule,
		routes::schedules::delete_schedule,
		routes::shifts::current_shifts_for_user,
		routes::shifts::current_drops_for_user,
		routes::shifts::current_pickups_for_user,
		routes::shifts::create_shift,
		routes::shifts::update_shift,
		routes::shifts::delete_shift,
		routes::shifts::add_shift_event,
		routes::alerts::active_alerts,
		routes::alerts::create_alert,
		routes::alerts::update_alert,
		routes::alerts::delete_alert,
		routes::users::list_users,
		routes::users::get_self,
		routes::users::get_self_scopes,
		routes::users::get_user,
		routes::users::get_user_by_email,
		routes::users::get_user_by_college_id,
		routes::users::create_user,
		routes::users::initialize_admin,
		routes::users::update_user,
		routes::users::delete_user,
		routes::users::grant_role,
		routes::users::revoke_role,
		routes::roles::list_roles,
		routes::roles::get_role,
		routes::roles::create_role,
		routes::roles::update_role,
		routes::roles::delete_role,
		routes::inventory::list_items,
		routes::inventory::public_items,
		routes::inventory::get_item,
		routes::inventory::create_item,
		routes::inventory::update_item,
		routes::inventory::delete_item,
		routes::restocks::list_requests,
		routes::restocks::list_requests_by_user,
		routes::restocks::get_request,
		routes::restocks::create_request,
		routes::restocks::update_request,
		routes::restocks::update_request_status,
		routes::restocks::delete_request,
		routes::scopes::list_scopes,
		routes::api_keys::list_api_keys,
		routes::api_keys::create_api_key,
		routes::api_keys::revoke_api_key,
		routes::activity::list_activity,
		routes::health::health
	),
	components(
		schemas(
			errors::ErrorResponse,
			authz::Scope,
			authz::ScopeArea,
			authz::ScopeDefinition,
			models::schedule::Schedule,
			models::schedule::SchedulePatch,
			models::schedule::PublicSchedule,
			models::schedule::PublicShift,
			models::schedule::Shift,
			models::schedule::ShiftEvent,
			models::schedule::ShiftEventType,
			models::schedule::Alert,
			models::schedule::ScheduleBody,
			models::schedule::SchedulePatchBody,
			models::schedule::ShiftBody,
			models::schedule::ShiftEventBody,
			models::schedule::AlertBody,
			models::user::User,
			models::user::RoleLog,
			models::user::UserInput,
			models::user::UserBody,
			models::user::SelfScopes,
			models::role::Role,
			models::role::RoleBody,
			models::inventory::InventoryItem,
			models::inventory::PublicInventoryItem,
			models::inventory::ItemLocation,
			models::inventory::ItemRole,
			models::inventory::ItemAccessType,
			models::inventory::ItemBody,
			models::restock::RestockRequest,
			models::restock::RestockStatus,
			models::restock::RestockStatusLog,
			models::restock::RestockInput,
			models::restock::RestockBody,
			models::restock::RestockStatusBody,
			models::api_key::ApiKey,
			models::api_key::ApiKeyCreateRequest,
			models::api_key::IssuedApiKey,
			events::ActivityEntry,
			routes::health::HealthResponse
		)
	),
	tags(
		(name = "Schedules", description = "Schedules and the current schedule"),
		(name = "Shifts", description = "Shifts and their event history"),
		(name = "Alerts", description = "Schedule alerts"),
		(name = "Users", description = "Users and role grants"),
		(name = "Roles", description = "Roles and their scopes"),
		(name = "Inventory", description = "Inventory items and where they are kept"),
		(name = "Restocks", description = "Restock requests"),
		(name = "Scopes", description = "Scope catalogue"),
		(name = "Api keys", description = "Legacy api keys"),
		(name = "Activity", description = "Audit trail"),
		(name = "Health", description = "Liveness")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	ensure_security_components(&mut doc);
	ensure_openapi_version(&mut doc);
	add_examples(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = {
		let doc_json = Arc::clone(&doc_json);
		get(move || {
			let doc_json = Arc::clone(&doc_json);
			async move { Json((*doc_json).clone()) }
		})
	};

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn object_entry<'a>(parent: &'a mut Value, key: &str) -> Option<&'a mut Map<String, Value>> {
	parent
		.as_object_mut()?
		.entry(key)
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
}

fn ensure_security_components(doc: &mut Value) {
	let Some(components) = object_entry(doc, "components") else { return; };
	let schemes = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()));
	let Some(schemes) = schemes.as_object_mut() else { return; };

	schemes.insert(
		REQUESTING_UUID_HEADER.to_string(),
		json!({
			"type": "apiKey",
			"in": "header",
			"name": REQUESTING_UUID_HEADER,
			"description": "Uuid of the calling user"
		}),
	);
	schemes.insert(
		authz::API_KEY_HEADER.to_string(),
		json!({
			"type": "apiKey",
			"in": "header",
			"name": authz::API_KEY_HEADER,
			"description": "Legacy api key, used when requesting_uuid is absent"
		}),
	);
}

fn ensure_openapi_version(doc: &mut Value) {
	if let Some(root) = doc.as_object_mut() {
		root.entry("openapi")
			.or_insert_with(|| Value::String("3.1.0".to_string()));
	}
}

fn add_examples(doc: &mut Value) {
	let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) else { return; };
	for item in paths.values_mut() {
		let Some(operations) = item.as_object_mut() else { continue; };
		for operation in operations.values_mut() {
			apply_request_examples(operation);
		}
	}
}

fn apply_request_examples(operation: &mut Value) {
	let Some(request_body) = operation.get_mut("requestBody") else { return; };
	let Some(content) = request_body.get_mut("content").and_then(Value::as_object_mut) else { return; };
	let Some(app_json) = content.get_mut("application/json").and_then(Value::as_object_mut) else { return; };
	let Some(schema) = app_json.get("schema").and_then(Value::as_object) else { return; };
	let Some(reference) = schema.get("$ref").and_then(Value::as_str) else { return; };

	let example = match reference {
		"#/components/schemas/ShiftBody" => Some(json!({
			"shift_obj": {
				"uuid": "S1",
				"day": 1,
				"sec_start": 36000,
				"sec_end": 43200,
				"assignee": "U1"
			}
		})),
		"#/components/schemas/ShiftEventBody" => Some(json!({
			"event_obj": {
				"timestamp": 1717430400,
				"shift_date": 1717372800,
				"type": "drop",
				"initiator": "U1"
			}
		})),
		"#/components/schemas/AlertBody" => Some(json!({
			"alert_obj": {
				"uuid": "A1",
				"default": false,
				"timestamp_start": 1717200000,
				"timestamp_end": 1717804800,
				"header": "Closed for maintenance",
				"message": "The laser cutter room is closed until Friday."
			}
		})),
		"#/components/schemas/ItemBody" => Some(json!({
			"item_obj": {
				"uuid": "ITEM-PLA-WHITE",
				"name": "PLA filament",
				"role": "M",
				"access_type": "TAKE_HOME",
				"locations": [{ "room": "cage", "container": "shelf 2", "quantity": -1 }],
				"keywords": ["3d printing"]
			}
		})),
		"#/components/schemas/RestockStatusBody" => Some(json!({
			"status_obj": {
				"timestamp": 1717430400,
				"status": "APPROVED_ORDERED",
				"message": "ordered"
			}
		})),
		_ => None,
	};

	if let Some(example) = example {
		app_json.insert("example".to_string(), example);
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let server_url = format!("http://localhost:{}", port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn security_scheme_and_server_are_injected() {
		let doc = build_openapi(9000).unwrap();
		let value = serde_json::to_value(&doc).unwrap();

		assert_eq!(
			value["components"]["securitySchemes"]["requesting_uuid"]["in"],
			"header"
		);
		assert_eq!(value["servers"][0]["url"], "http://localhost:9000");
		assert!(value["paths"]["/schedules/{schedule_uuid}/shifts"]["post"].is_object());
	}
}
