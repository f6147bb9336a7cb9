//! Client-side access to the clinic API.
//!
//! Every call resolves to an `Envelope`, never an error: transport
//! failures, undecodable bodies and server-side rejections all come back
//! as `success: false` with a `message` the UI can show directly.

pub mod draft;
pub mod session;

pub use draft::{DraftLine, PrescriptionDraft};
pub use session::{Session, StoredSession};

use std::sync::Arc;
use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::types::{Envelope, LoginRequest, LoginResponse};
use crate::models::*;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Session encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Session lock poisoned")]
    LockPoisoned,
}

pub struct ClinicClient {
    base_url: String,
    http: reqwest::Client,
    session: Arc<Session>,
}

impl ClinicClient {
    pub fn new(base_url: &str, session: Arc<Session>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ── Authentication ──────────────────────────────────────

    /// Log in and persist the session. `data` is the signed-in user.
    pub async fn login(&self, username: &str, password: &str) -> Envelope<UserSummary> {
        let request = self.http.post(self.url("/api/login")).json(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        });

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Login request failed");
                return Envelope::failure("Login failed");
            }
        };

        if !response.status().is_success() {
            let body: Envelope<()> = response
                .json()
                .await
                .unwrap_or_else(|_| Envelope::failure("Login failed"));
            return Envelope::failure(body.text().unwrap_or("Login failed"));
        }

        let login: LoginResponse = match response.json().await {
            Ok(login) => login,
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable login response");
                return Envelope::failure("Login failed");
            }
        };

        if let Err(e) = self.session.login(login.token, login.user.clone()) {
            tracing::error!(error = %e, "Could not persist session");
            return Envelope::failure("Login failed");
        }
        Envelope::ok(login.user)
    }

    pub fn logout(&self) -> Envelope<()> {
        match self.session.logout() {
            Ok(()) => Envelope::message("Logged out"),
            Err(e) => {
                tracing::error!(error = %e, "Could not clear session");
                Envelope::failure("Logout failed")
            }
        }
    }

    // ── Patients ────────────────────────────────────────────

    pub async fn patients(&self) -> Envelope<Vec<Patient>> {
        self.send(self.http.get(self.url("/api/patients")), "Failed to fetch patients")
            .await
    }

    pub async fn patient(&self, id: i64) -> Envelope<Patient> {
        self.send(
            self.http.get(self.url(&format!("/api/patients/{id}"))),
            "Failed to load patient details",
        )
        .await
    }

    pub async fn create_patient(&self, input: &PatientInput) -> Envelope<Patient> {
        self.send(
            self.http.post(self.url("/api/patients")).json(input),
            "Failed to create patient",
        )
        .await
    }

    pub async fn update_patient(&self, id: i64, input: &PatientInput) -> Envelope<Patient> {
        self.send(
            self.http.put(self.url(&format!("/api/patients/{id}"))).json(input),
            "Failed to update patient",
        )
        .await
    }

    pub async fn delete_patient(&self, id: i64) -> Envelope<()> {
        self.send(
            self.http.delete(self.url(&format!("/api/patients/{id}"))),
            "Failed to delete patient",
        )
        .await
    }

    pub async fn monthly_stats(&self) -> Envelope<MonthlyCounts> {
        self.send(
            self.http.get(self.url("/api/patients/monthly-stats")),
            "Failed to fetch monthly statistics",
        )
        .await
    }

    pub async fn patient_prescriptions(&self, patient_id: i64) -> Envelope<Vec<Prescription>> {
        self.send(
            self.http
                .get(self.url(&format!("/api/patients/{patient_id}/prescriptions"))),
            "Failed to fetch prescriptions",
        )
        .await
    }

    // ── Prescriptions ───────────────────────────────────────

    pub async fn prescriptions(&self) -> Envelope<Vec<Prescription>> {
        self.send(
            self.http.get(self.url("/api/prescriptions")),
            "Failed to fetch prescriptions",
        )
        .await
    }

    pub async fn prescription(&self, id: i64) -> Envelope<PrescriptionDetail> {
        self.send(
            self.http.get(self.url(&format!("/api/prescriptions/{id}"))),
            "Failed to load prescription",
        )
        .await
    }

    /// Submit a draft. Draft-level problems (no complete line) are
    /// reported without a round trip.
    pub async fn submit_prescription(&self, draft: &PrescriptionDraft) -> Envelope<Prescription> {
        match draft.submission() {
            Ok(body) => self.create_prescription(&body).await,
            Err(e) => Envelope::failure(e.0),
        }
    }

    pub async fn create_prescription(&self, body: &NewPrescription) -> Envelope<Prescription> {
        self.send(
            self.http.post(self.url("/api/prescriptions")).json(body),
            "Failed to save prescription.",
        )
        .await
    }

    pub async fn update_prescription(
        &self,
        id: i64,
        body: &PrescriptionUpdate,
    ) -> Envelope<Prescription> {
        self.send(
            self.http
                .put(self.url(&format!("/api/prescriptions/{id}")))
                .json(body),
            "Failed to update prescription",
        )
        .await
    }

    pub async fn delete_prescription(&self, id: i64) -> Envelope<()> {
        self.send(
            self.http.delete(self.url(&format!("/api/prescriptions/{id}"))),
            "Failed to delete prescription",
        )
        .await
    }

    // ── Medicines ───────────────────────────────────────────

    pub async fn medicines(&self) -> Envelope<Vec<Medicine>> {
        self.send(self.http.get(self.url("/api/medicines")), "Failed to fetch medicines")
            .await
    }

    pub async fn create_medicine(&self, input: &MedicineInput) -> Envelope<Medicine> {
        self.send(
            self.http.post(self.url("/api/medicines")).json(input),
            "Failed to add medicine",
        )
        .await
    }

    pub async fn update_medicine(&self, id: i64, input: &MedicineInput) -> Envelope<Medicine> {
        self.send(
            self.http.put(self.url(&format!("/api/medicines/{id}"))).json(input),
            "Failed to update medicine",
        )
        .await
    }

    pub async fn delete_medicine(&self, id: i64) -> Envelope<()> {
        self.send(
            self.http.delete(self.url(&format!("/api/medicines/{id}"))),
            "Failed to delete medicine",
        )
        .await
    }

    // ── Plumbing ────────────────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Authorize, send, and fold every outcome into an envelope.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, fallback: &str) -> Envelope<T> {
        match self.try_send(request).await {
            Ok(envelope) if envelope.success => envelope,
            Ok(envelope) => Envelope::failure(envelope.text().unwrap_or(fallback)),
            Err(e) => {
                tracing::warn!(error = %e, "{fallback}");
                Envelope::failure(fallback)
            }
        }
    }

    async fn try_send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Envelope<T>, ClientError> {
        let token = self.session.token().ok_or(ClientError::NotLoggedIn)?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        response.json::<Envelope<T>>().await.map_err(|e| {
            ClientError::Decode(format!("status {}: {e}", status.as_u16()))
        })
    }
}
