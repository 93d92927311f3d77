use flexy_core::api::{ApiError, ApiPaths, Operation, ShiftApi};
use flexy_core::shift::{Caregiver, ShiftPayload, ShiftRecord, ShiftTemplate};
use flexy_core::template::GenerateRequest;
use flexy_core::view::DateWindow;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

/// `reqwest` implementation of the backend calls.
pub struct HttpShiftApi {
    http: reqwest::Client,
    paths: ApiPaths,
}

impl HttpShiftApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            paths: ApiPaths::new(base_url),
        }
    }

    pub fn paths(&self) -> &ApiPaths {
        &self.paths
    }

    /// Raw iCalendar body for `window`. The content is passed through as-is.
    #[instrument(skip(self))]
    pub async fn download_ics(&self, window: DateWindow) -> Result<String, ApiError> {
        let response = self.send(self.http.get(self.paths.ics_download(&window))).await?;
        read_body(response, Operation::ExportIcs).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        request.send().await.map_err(|err| ApiError::Transport(err.to_string()))
    }

    async fn fetch_json<T>(
        &self,
        request: reqwest::RequestBuilder,
        operation: Operation,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(request).await?;
        let body = read_body(response, operation).await?;
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

async fn read_body(response: reqwest::Response, operation: Operation) -> Result<String, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| ApiError::Transport(err.to_string()))?;

    if !status.is_success() {
        return Err(ApiError::from_status(status.as_u16(), &body, operation.failure()));
    }

    debug!(status = status.as_u16(), bytes = body.len(), "received response");
    Ok(body)
}

impl ShiftApi for HttpShiftApi {
    #[instrument(skip(self))]
    async fn list_shifts(&self, window: DateWindow) -> Result<Vec<ShiftRecord>, ApiError> {
        self.fetch_json(self.http.get(self.paths.shifts_in(&window)), Operation::LoadShifts)
            .await
    }

    #[instrument(skip(self))]
    async fn get_shift(&self, id: &str) -> Result<ShiftRecord, ApiError> {
        self.fetch_json(self.http.get(self.paths.shift(id)), Operation::LoadShift)
            .await
    }

    #[instrument(skip_all)]
    async fn create_shift(&self, payload: &ShiftPayload) -> Result<ShiftRecord, ApiError> {
        self.fetch_json(
            self.http.post(self.paths.shifts()).json(payload),
            Operation::SaveShift,
        )
        .await
    }

    #[instrument(skip(self, payload))]
    async fn update_shift(&self, id: &str, payload: &ShiftPayload) -> Result<ShiftRecord, ApiError> {
        self.fetch_json(
            self.http.put(self.paths.shift(id)).json(payload),
            Operation::SaveShift,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_shift(&self, id: &str) -> Result<(), ApiError> {
        let response = self.send(self.http.delete(self.paths.shift(id))).await?;
        read_body(response, Operation::DeleteShift).await.map(|_| ())
    }

    #[instrument(skip(self))]
    async fn list_caregivers(&self) -> Result<Vec<Caregiver>, ApiError> {
        self.fetch_json(self.http.get(self.paths.caregivers()), Operation::LoadCaregivers)
            .await
    }

    #[instrument(skip(self))]
    async fn list_templates(&self) -> Result<Vec<ShiftTemplate>, ApiError> {
        self.fetch_json(self.http.get(self.paths.templates()), Operation::LoadTemplates)
            .await
    }

    #[instrument(skip_all, fields(template = %request.template_id))]
    async fn apply_template(&self, request: &GenerateRequest) -> Result<(), ApiError> {
        let response = self
            .send(
                self.http
                    .post(self.paths.apply_template(&request.template_id))
                    .json(request),
            )
            .await?;
        read_body(response, Operation::ApplyTemplate).await.map(|_| ())
    }
}
