//! Clinic API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`. Everything except `/api/login` sits
//! behind the auth and audit middleware.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the clinic API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn clinic_api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route("/patients/monthly-stats", get(endpoints::patients::monthly_stats))
        .route(
            "/patients/:id",
            get(endpoints::patients::get)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::delete),
        )
        .route(
            "/patients/:id/prescriptions",
            get(endpoints::patients::prescriptions),
        )
        .route(
            "/medicines",
            get(endpoints::medicines::list).post(endpoints::medicines::create),
        )
        .route(
            "/medicines/:id",
            get(endpoints::medicines::get)
                .put(endpoints::medicines::update)
                .delete(endpoints::medicines::delete),
        )
        .route(
            "/prescriptions",
            get(endpoints::prescriptions::list).post(endpoints::prescriptions::create),
        )
        .route(
            "/prescriptions/:id",
            get(endpoints::prescriptions::get)
                .put(endpoints::prescriptions::update)
                .delete(endpoints::prescriptions::delete),
        )
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new()
        .route("/login", post(endpoints::auth::login))
        .with_state(ctx);

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use chrono::{Datelike, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::core_state::testing::{seed_user, test_core, token_for};
    use crate::crypto::TokenSigner;

    struct Harness {
        core: Arc<CoreState>,
        token: String,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            let (core, dir) = test_core();
            let token = token_for(&core, "drmehta");
            Self {
                core,
                token,
                _dir: dir,
            }
        }

        async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            self.send_with_auth(method, uri, body, Some(&format!("Bearer {}", self.token)))
                .await
        }

        async fn send_with_auth(
            &self,
            method: Method,
            uri: &str,
            body: Option<Value>,
            auth: Option<&str>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(value) = auth {
                builder = builder.header("Authorization", value);
            }
            let request = match body {
                Some(json) => builder
                    .header("Content-Type", "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = clinic_api_router(self.core.clone())
                .oneshot(request)
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }

        async fn create_patient(&self, name: &str, weight: Option<f64>) -> i64 {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/api/patients",
                    Some(json!({"name": name, "age": 30, "weight": weight})),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            body["data"]["id"].as_i64().unwrap()
        }

        fn table_count(&self, table: &str) -> i64 {
            let conn = self.core.open_db().unwrap();
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
                .unwrap()
        }
    }

    fn line(name: &str, dosage: &str) -> Value {
        json!({"medicine_name": name, "dosage": dosage, "frequency": "BID", "duration": "5 days"})
    }

    // ── Authentication ──────────────────────────────────────

    #[tokio::test]
    async fn login_returns_token_and_user_summary() {
        let h = Harness::new();
        seed_user(&h.core, "nurse", "s3cret");

        let (status, body) = h
            .send_with_auth(
                Method::POST,
                "/api/login",
                Some(json!({"username": "nurse", "password": "s3cret"})),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["name"], "Dr. Test");
        assert_eq!(body["user"]["role"], "doctor");
        assert!(body["user"].get("password_hash").is_none());

        let token = body["token"].as_str().unwrap();
        let claims = h.core.signer().verify(token).unwrap();
        assert_eq!(claims.username, "nurse");
    }

    #[tokio::test]
    async fn login_rejects_bad_password_and_unknown_user_alike() {
        let h = Harness::new();
        seed_user(&h.core, "nurse", "s3cret");

        for creds in [
            json!({"username": "nurse", "password": "wrong"}),
            json!({"username": "ghost", "password": "s3cret"}),
        ] {
            let (status, body) = h
                .send_with_auth(Method::POST, "/api/login", Some(creds), None)
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Invalid credentials");
        }
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let h = Harness::new();
        let (status, body) = h
            .send_with_auth(Method::GET, "/api/patients", None, None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Access token required");
    }

    #[tokio::test]
    async fn bad_tokens_are_403_on_every_protected_route() {
        let h = Harness::new();
        let other = TokenSigner::new(b"other-secret", chrono::Duration::hours(24));
        let user = seed_user(&h.core, "intruder", "pw");
        let foreign = other.issue(&user).unwrap();
        let expired = TokenSigner::new(b"test-secret", chrono::Duration::hours(-1))
            .issue(&user)
            .unwrap();

        let routes = [
            (Method::GET, "/api/patients"),
            (Method::POST, "/api/patients"),
            (Method::DELETE, "/api/patients/1"),
            (Method::GET, "/api/patients/monthly-stats"),
            (Method::POST, "/api/prescriptions"),
            (Method::PUT, "/api/prescriptions/1"),
            (Method::DELETE, "/api/medicines/1"),
        ];
        for token in ["garbage", foreign.as_str(), expired.as_str()] {
            for (method, uri) in routes.iter() {
                let (status, _) = h
                    .send_with_auth(
                        method.clone(),
                        uri,
                        Some(json!({"name": "x"})),
                        Some(&format!("Bearer {token}")),
                    )
                    .await;
                assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
            }
        }
        assert_eq!(h.table_count("patients"), 0);
    }

    // ── Patients ────────────────────────────────────────────

    #[tokio::test]
    async fn patient_crud_round() {
        let h = Harness::new();
        let id = h.create_patient("Asha Rao", Some(54.5)).await;

        let (status, body) = h.send(Method::GET, &format!("/api/patients/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Asha Rao");
        assert_eq!(body["data"]["weight"], 54.5);

        let (status, body) = h
            .send(
                Method::PUT,
                &format!("/api/patients/{id}"),
                Some(json!({"name": "Asha R. Rao", "blood_group": "O+"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Asha R. Rao");
        assert_eq!(body["data"]["blood_group"], "O+");
        // Full replace: omitted fields are cleared
        assert_eq!(body["data"]["weight"], Value::Null);

        let (status, body) = h.send(Method::DELETE, &format!("/api/patients/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Patient deleted successfully");

        let (status, _) = h.send(Method::GET, &format!("/api/patients/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patient_list_is_newest_first() {
        let h = Harness::new();
        h.create_patient("First", None).await;
        h.create_patient("Second", None).await;

        let (_, body) = h.send(Method::GET, "/api/patients", None).await;
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Second", "First"]);
    }

    #[tokio::test]
    async fn patient_validation_and_unknown_fields_are_400() {
        let h = Harness::new();
        let (status, body) = h
            .send(Method::POST, "/api/patients", Some(json!({"name": "  "})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = h
            .send(
                Method::POST,
                "/api/patients",
                Some(json!({"name": "Ravi", "is_admin": true})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(h.table_count("patients"), 0);
    }

    #[tokio::test]
    async fn missing_ids_are_404_for_update_and_delete() {
        let h = Harness::new();
        for (method, uri, body) in [
            (Method::PUT, "/api/patients/999", Some(json!({"name": "Nobody"}))),
            (Method::DELETE, "/api/patients/999", None),
            (Method::DELETE, "/api/medicines/999", None),
            (Method::DELETE, "/api/prescriptions/999", None),
            (Method::GET, "/api/prescriptions/999", None),
        ] {
            let (status, json) = h.send(method.clone(), uri, body).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
            assert_eq!(json["success"], false);
        }
    }

    #[tokio::test]
    async fn non_numeric_id_is_400() {
        let h = Harness::new();
        let (status, body) = h.send(Method::GET, "/api/patients/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid id");
    }

    #[tokio::test]
    async fn monthly_stats_has_twelve_months() {
        let h = Harness::new();
        let (status, body) = h.send(Method::GET, "/api/patients/monthly-stats", None).await;
        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_object().unwrap();
        assert_eq!(data.len(), 12);
        assert!(data.values().all(|v| v == 0));

        h.create_patient("Today", None).await;
        let (_, body) = h.send(Method::GET, "/api/patients/monthly-stats", None).await;
        let month = crate::models::MONTH_NAMES[Utc::now().month0() as usize];
        assert_eq!(body["data"][month], 1);
        assert_eq!(body["data"].as_object().unwrap().len(), 12);
    }

    // ── Medicines ───────────────────────────────────────────

    #[tokio::test]
    async fn medicines_sorted_by_name_and_unique() {
        let h = Harness::new();
        for name in ["Paracetamol", "Amoxicillin"] {
            let (status, _) = h
                .send(
                    Method::POST,
                    "/api/medicines",
                    Some(json!({"name": name, "common_dosage": "500mg"})),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, body) = h.send(Method::GET, "/api/medicines", None).await;
        assert_eq!(body["data"][0]["name"], "Amoxicillin");
        assert_eq!(body["data"][1]["name"], "Paracetamol");

        let (status, body) = h
            .send(Method::POST, "/api/medicines", Some(json!({"name": "Amoxicillin"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn medicine_get_update_delete() {
        let h = Harness::new();
        let (_, body) = h
            .send(Method::POST, "/api/medicines", Some(json!({"name": "Cetirizine"})))
            .await;
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = h
            .send(
                Method::PUT,
                &format!("/api/medicines/{id}"),
                Some(json!({"name": "Cetirizine", "common_dosage": "10mg", "form": "tablet"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["common_dosage"], "10mg");

        let (_, body) = h.send(Method::GET, &format!("/api/medicines/{id}"), None).await;
        assert_eq!(body["data"]["form"], "tablet");

        let (status, body) = h.send(Method::DELETE, &format!("/api/medicines/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Medicine deleted successfully");
    }

    // ── Prescriptions ───────────────────────────────────────

    #[tokio::test]
    async fn create_prescription_with_lines() {
        let h = Harness::new();
        let patient_id = h.create_patient("Kiran", Some(20.0)).await;

        let (status, body) = h
            .send(
                Method::POST,
                "/api/prescriptions",
                Some(json!({
                    "patient_id": patient_id,
                    "diagnosis": "Otitis media",
                    "next_visit_date": "2026-11-02",
                    "medicines": [line("Amoxicillin", "500mg"), line("Paracetamol", "250mg")],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let data = &body["data"];
        assert_eq!(data["patient_id"], patient_id);
        assert_eq!(data["next_visit_date"], "2026-11-02");
        assert_eq!(data["medicines"].as_array().unwrap().len(), 2);
        assert_eq!(data["medicines"][0]["medicine_name"], "Amoxicillin");
        assert_eq!(data["medicines"][1]["medicine_name"], "Paracetamol");
    }

    #[tokio::test]
    async fn prescription_for_unknown_patient_is_404_and_writes_nothing() {
        let h = Harness::new();
        let (status, _) = h
            .send(
                Method::POST,
                "/api/prescriptions",
                Some(json!({"patient_id": 42, "medicines": [line("Amoxicillin", "500mg")]})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(h.table_count("prescriptions"), 0);
        assert_eq!(h.table_count("prescription_medicines"), 0);
    }

    #[tokio::test]
    async fn invalid_line_is_rejected_before_any_write() {
        let h = Harness::new();
        let patient_id = h.create_patient("Kiran", None).await;
        let (status, body) = h
            .send(
                Method::POST,
                "/api/prescriptions",
                Some(json!({
                    "patient_id": patient_id,
                    "medicines": [line("Amoxicillin", "500mg"), line("Ibuprofen", "")],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Medicine line 2: Dosage is required");
        assert_eq!(h.table_count("prescriptions"), 0);
    }

    #[tokio::test]
    async fn update_replaces_whole_line_set() {
        let h = Harness::new();
        let patient_id = h.create_patient("Kiran", None).await;
        let (_, body) = h
            .send(
                Method::POST,
                "/api/prescriptions",
                Some(json!({
                    "patient_id": patient_id,
                    "medicines": [line("A", "1mg"), line("B", "2mg"), line("C", "3mg")],
                })),
            )
            .await;
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = h
            .send(
                Method::PUT,
                &format!("/api/prescriptions/{id}"),
                Some(json!({"diagnosis": "Revised", "medicines": [line("D", "4mg")]})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["diagnosis"], "Revised");
        assert_eq!(body["data"]["medicines"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["medicines"][0]["medicine_name"], "D");
        assert_eq!(h.table_count("prescription_medicines"), 1);

        let (status, _) = h
            .send(
                Method::PUT,
                "/api/prescriptions/999",
                Some(json!({"medicines": [line("E", "5mg")]})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(h.table_count("prescription_medicines"), 1);
    }

    #[tokio::test]
    async fn patient_prescriptions_and_detail() {
        let h = Harness::new();
        let patient_id = h.create_patient("Meera", None).await;
        for diagnosis in ["Cold", "Flu"] {
            h.send(
                Method::POST,
                "/api/prescriptions",
                Some(json!({"patient_id": patient_id, "diagnosis": diagnosis})),
            )
            .await;
        }

        let (status, body) = h
            .send(Method::GET, &format!("/api/patients/{patient_id}/prescriptions"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let list = body["data"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["diagnosis"], "Flu");
        // Zero-line prescriptions embed an empty array
        assert_eq!(list[0]["medicines"], json!([]));

        let id = list[1]["id"].as_i64().unwrap();
        let (status, body) = h.send(Method::GET, &format!("/api/prescriptions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["diagnosis"], "Cold");
        assert_eq!(body["data"]["patient"]["name"], "Meera");

        let (_, body) = h.send(Method::GET, "/api/patients/777/prescriptions", None).await;
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn catalog_edit_leaves_prescription_lines_alone() {
        let h = Harness::new();
        let patient_id = h.create_patient("Meera", None).await;
        let (_, body) = h
            .send(
                Method::POST,
                "/api/medicines",
                Some(json!({"name": "Azithromycin", "common_dosage": "250mg"})),
            )
            .await;
        let medicine_id = body["data"]["id"].as_i64().unwrap();

        let (_, body) = h
            .send(
                Method::POST,
                "/api/prescriptions",
                Some(json!({
                    "patient_id": patient_id,
                    "medicines": [{"medicine_id": medicine_id, "name": "Azithromycin", "dosage": "250mg"}],
                })),
            )
            .await;
        let prescription_id = body["data"]["id"].as_i64().unwrap();

        h.send(
            Method::PUT,
            &format!("/api/medicines/{medicine_id}"),
            Some(json!({"name": "Azithromycin DT", "common_dosage": "500mg"})),
        )
        .await;
        h.send(Method::DELETE, &format!("/api/medicines/{medicine_id}"), None)
            .await;

        let (_, body) = h
            .send(Method::GET, &format!("/api/prescriptions/{prescription_id}"), None)
            .await;
        assert_eq!(body["data"]["medicines"][0]["medicine_name"], "Azithromycin");
        assert_eq!(body["data"]["medicines"][0]["dosage"], "250mg");
    }

    #[tokio::test]
    async fn deleting_patient_removes_their_prescriptions() {
        let h = Harness::new();
        let patient_id = h.create_patient("Temp", None).await;
        h.send(
            Method::POST,
            "/api/prescriptions",
            Some(json!({"patient_id": patient_id, "medicines": [line("A", "1mg")]})),
        )
        .await;

        h.send(Method::DELETE, &format!("/api/patients/{patient_id}"), None)
            .await;
        assert_eq!(h.table_count("prescriptions"), 0);
        assert_eq!(h.table_count("prescription_medicines"), 0);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let h = Harness::new();
        let (status, _) = h.send(Method::GET, "/nonexistent", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
