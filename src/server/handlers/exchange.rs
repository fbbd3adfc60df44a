use std::collections::HashMap;

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    Form,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::errors::ExchangeError;
use crate::exchange::{serializer, Decisions, ImportOutcome, ImportReview, ImportStart};
use crate::server::app::{header_credential, AppState};
use crate::server::error::{ApiError, ApiResult};

pub const PASSWORD_FIELD: &str = "password";
pub const FILE_FIELD: &str = "import_file";
pub const TOKEN_FIELD: &str = "token";

/// Result of an upload: applied straight away, or staged for duplicate decisions.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ImportResponse {
    Imported(ImportOutcome),
    Review(ImportReview),
}

impl From<ImportStart> for ImportResponse {
    fn from(start: ImportStart) -> Self {
        match start {
            ImportStart::Applied(outcome) => ImportResponse::Imported(outcome),
            ImportStart::Review(review) => ImportResponse::Review(review),
        }
    }
}

type FormFields = Option<Form<HashMap<String, String>>>;

fn fields(form: &FormFields) -> Option<&HashMap<String, String>> {
    form.as_ref().map(|Form(fields)| fields)
}

/// Password form field, falling back to the password header.
fn credential<'a>(form: Option<&'a HashMap<String, String>>, headers: &'a HeaderMap) -> Option<&'a str> {
    form.and_then(|fields| fields.get(PASSWORD_FIELD))
        .map(String::as_str)
        .or_else(|| header_credential(headers))
}

fn authorize(state: &AppState, credential: Option<&str>) -> ApiResult<()> {
    if state.is_authorized(credential) {
        Ok(())
    } else {
        Err(ExchangeError::Unauthorized.into())
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/export",
    responses(
        (status = 200, description = "Full dataset as a JSON attachment", body = crate::exchange::Document),
        (status = 401, description = "Invalid upload password")
    )
)]
pub async fn export_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: FormFields,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, credential(fields(&form), &headers))?;

    let document = state.exchange.export().await?;
    let body = serializer::to_json_bytes(&document)?;
    let filename = serializer::export_filename(Utc::now());
    info!("Serving export {} ({} bytes)", filename, body.len());

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/import",
    responses(
        (status = 200, description = "Imported at once, or staged with duplicate previews"),
        (status = 400, description = "Missing file or invalid document"),
        (status = 401, description = "Invalid upload password")
    )
)]
pub async fn upload_import(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<ImportResponse>> {
    let mut password: Option<String> = None;
    let mut file: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            PASSWORD_FIELD => {
                password = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| ApiError::bad_request(err.to_string()))?,
                );
            }
            FILE_FIELD => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::bad_request(err.to_string()))?;
                file = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    authorize(
        &state,
        password.as_deref().or_else(|| header_credential(&headers)),
    )?;

    let bytes = match file {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(ExchangeError::MissingFile.into()),
    };

    let start = state.exchange.begin_import(&bytes).await?;
    Ok(Json(start.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/import/confirm",
    responses(
        (status = 200, description = "Staged import applied", body = ImportOutcome),
        (status = 404, description = "Unknown or expired token")
    )
)]
pub async fn confirm_import(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: FormFields,
) -> ApiResult<Json<ImportOutcome>> {
    let fields = fields(&form);
    authorize(&state, credential(fields, &headers))?;

    let token = fields
        .and_then(|fields| fields.get(TOKEN_FIELD))
        .ok_or_else(|| ApiError::bad_request("Missing import token"))?;
    let decisions = Decisions::from_form_fields(
        fields
            .into_iter()
            .flatten()
            .map(|(key, value)| (key.as_str(), value.as_str())),
    );

    let outcome = state.exchange.confirm_import(token, &decisions).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/import/discard",
    responses(
        (status = 204, description = "Staged import removed"),
        (status = 404, description = "Unknown or expired token")
    )
)]
pub async fn discard_import(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: FormFields,
) -> ApiResult<StatusCode> {
    let fields = fields(&form);
    authorize(&state, credential(fields, &headers))?;

    let token = fields
        .and_then(|fields| fields.get(TOKEN_FIELD))
        .ok_or_else(|| ApiError::bad_request("Missing import token"))?;
    state.exchange.discard_import(token).await?;

    Ok(StatusCode::NO_CONTENT)
}
