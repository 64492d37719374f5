use anyhow::Result;
use serde_json::Value;

use makerspace::docs::build_openapi;

#[test]
fn every_resource_is_documented() -> Result<()> {
    let doc: Value = serde_json::to_value(build_openapi(8000)?)?;
    let paths = doc["paths"].as_object().cloned().unwrap_or_default();

    for path in [
        "/schedules",
        "/schedules/current",
        "/schedules/current/alerts",
        "/schedules/{schedule_uuid}/shifts/{shift_uuid}/event",
        "/users/self/scopes",
        "/users/initialize_admin",
        "/users/roles",
        "/users/by/email/{email}",
        "/users/by/id/{college_id}",
        "/inventory",
        "/inventory/public",
        "/inventory/{item_uuid}",
        "/restocks/{request_uuid}/status",
        "/api-keys",
        "/scopes",
        "/activity",
        "/api/health",
    ] {
        assert!(paths.contains_key(path), "missing {path}");
    }
    Ok(())
}

#[test]
fn identity_headers_are_security_schemes() -> Result<()> {
    let doc: Value = serde_json::to_value(build_openapi(8000)?)?;
    let schemes = &doc["components"]["securitySchemes"];
    assert_eq!(schemes["requesting_uuid"]["name"], "requesting_uuid");
    assert_eq!(schemes["api_key"]["in"], "header");

    let example = &doc["paths"]["/restocks/{request_uuid}/status"]["patch"]["requestBody"]["content"]["application/json"]["example"];
    assert_eq!(example["status_obj"]["status"], "APPROVED_ORDERED");
    Ok(())
}
