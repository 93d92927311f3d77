use flexy_core::api::{
  ApiError,
  ApiPaths,
  Operation,
  ShiftApi
};
use flexy_core::shift::{
  Caregiver,
  ShiftPayload,
  ShiftRecord,
  ShiftTemplate
};
use flexy_core::template::GenerateRequest;
use flexy_core::view::DateWindow;
use gloo::net::http::{
  Request,
  RequestBuilder,
  Response
};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Browser fetch client for the shift backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GlooShiftApi {
  paths: ApiPaths
}

impl GlooShiftApi {
  pub fn new(
    base: impl Into<String>
  ) -> Self {
    Self {
      paths: ApiPaths::new(base)
    }
  }

  pub fn paths(&self) -> &ApiPaths {
    &self.paths
  }
}

fn transport(
  err: gloo::net::Error
) -> ApiError {
  ApiError::Transport(err.to_string())
}

async fn send(
  request: RequestBuilder
) -> Result<Response, ApiError> {
  request.send().await.map_err(transport)
}

async fn send_json<B>(
  request: RequestBuilder,
  body: &B
) -> Result<Response, ApiError>
where
  B: Serialize + ?Sized
{
  request
    .json(body)
    .map_err(transport)?
    .send()
    .await
    .map_err(transport)
}

async fn read_body(
  response: Response,
  operation: Operation
) -> Result<String, ApiError> {
  let status = response.status();
  let body = response
    .text()
    .await
    .map_err(transport)?;

  if !response.ok() {
    tracing::warn!(
      status,
      ?operation,
      "backend returned an error"
    );
    return Err(ApiError::from_status(
      status,
      &body,
      operation.failure()
    ));
  }
  Ok(body)
}

async fn decode<T>(
  response: Response,
  operation: Operation
) -> Result<T, ApiError>
where
  T: DeserializeOwned
{
  let body =
    read_body(response, operation)
      .await?;
  serde_json::from_str(&body).map_err(
    |err| ApiError::Decode(err.to_string())
  )
}

impl ShiftApi for GlooShiftApi {
  async fn list_shifts(
    &self,
    window: DateWindow
  ) -> Result<Vec<ShiftRecord>, ApiError>
  {
    let url =
      self.paths.shifts_in(&window);
    tracing::debug!(%url, "fetching shifts");
    decode(
      send(Request::get(&url)).await?,
      Operation::LoadShifts
    )
    .await
  }

  async fn get_shift(
    &self,
    id: &str
  ) -> Result<ShiftRecord, ApiError> {
    decode(
      send(Request::get(
        &self.paths.shift(id)
      ))
      .await?,
      Operation::LoadShift
    )
    .await
  }

  async fn create_shift(
    &self,
    payload: &ShiftPayload
  ) -> Result<ShiftRecord, ApiError> {
    decode(
      send_json(
        Request::post(
          &self.paths.shifts()
        ),
        payload
      )
      .await?,
      Operation::SaveShift
    )
    .await
  }

  async fn update_shift(
    &self,
    id: &str,
    payload: &ShiftPayload
  ) -> Result<ShiftRecord, ApiError> {
    decode(
      send_json(
        Request::put(
          &self.paths.shift(id)
        ),
        payload
      )
      .await?,
      Operation::SaveShift
    )
    .await
  }

  async fn delete_shift(
    &self,
    id: &str
  ) -> Result<(), ApiError> {
    let response = send(Request::delete(
      &self.paths.shift(id)
    ))
    .await?;
    read_body(
      response,
      Operation::DeleteShift
    )
    .await
    .map(|_| ())
  }

  async fn list_caregivers(
    &self
  ) -> Result<Vec<Caregiver>, ApiError> {
    decode(
      send(Request::get(
        &self.paths.caregivers()
      ))
      .await?,
      Operation::LoadCaregivers
    )
    .await
  }

  async fn list_templates(
    &self
  ) -> Result<Vec<ShiftTemplate>, ApiError>
  {
    decode(
      send(Request::get(
        &self.paths.templates()
      ))
      .await?,
      Operation::LoadTemplates
    )
    .await
  }

  async fn apply_template(
    &self,
    request: &GenerateRequest
  ) -> Result<(), ApiError> {
    let response = send_json(
      Request::post(
        &self
          .paths
          .apply_template(
            &request.template_id
          )
      ),
      request
    )
    .await?;
    read_body(
      response,
      Operation::ApplyTemplate
    )
    .await
    .map(|_| ())
  }
}
