use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use chrono::Utc;
use metrics::counter;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::classifier::Assessment;
use crate::error::ApiError;
use crate::media;
use crate::repository::VerificationRecord;
use crate::types::{
    AnalysisRequest, ContentType, HealthResponse, VerificationListResponse, VerificationSummary,
    VerifyRequest, VerifyResponse,
};

const STATUS_COMPLETED: &str = "completed";

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[tracing::instrument(skip(state, request), fields(content_len = request.content.len()))]
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    counter!("verification_requests_total", "content_type" => "text").increment(1);

    if request.content_type != ContentType::Text {
        return Err(ApiError::Validation(format!(
            "content_type must be 'text'; use /api/v1/verify/file for {} uploads",
            request.content_type
        )));
    }
    if request.content.trim().is_empty() {
        return Err(ApiError::Validation(
            "content must not be empty".to_string(),
        ));
    }

    tracing::info!("Processing text verification request");

    let analysis = state
        .engine
        .analyze(AnalysisRequest {
            content: request.content,
        })
        .await?;
    let assessment = state.classifier.assess_text(&analysis);
    tracing::debug!(
        predicted = %analysis.predicted,
        tokens = analysis.token_count,
        verdict = assessment.verdict.label(),
        "Text analysis completed"
    );

    let record = build_record(ContentType::Text, request.source_url, &assessment);
    state.repository.insert(&record).await?;

    tracing::info!(verification_id = %record.id, "Verification completed");
    Ok(Json(respond(record)))
}

#[tracing::instrument(skip(state, multipart))]
pub async fn verify_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<VerifyResponse>, ApiError> {
    counter!("verification_requests_total", "content_type" => "file").increment(1);

    let mut upload: Option<(String, usize)> = None;
    let mut declared_type: Option<String> = None;
    let mut source_url: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if filename.is_empty() {
                    return Err(ApiError::Validation(
                        "file field must carry a filename".to_string(),
                    ));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read file: {e}")))?;
                upload = Some((filename, bytes.len()));
            }
            "content_type" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read field: {e}")))?;
                declared_type = Some(value);
            }
            "source_url" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read field: {e}")))?;
                if !value.is_empty() {
                    source_url = Some(value);
                }
            }
            _ => {}
        }
    }

    let (filename, size_bytes) =
        upload.ok_or_else(|| ApiError::Validation("a file is required".to_string()))?;
    let declared_type =
        declared_type.ok_or_else(|| ApiError::Validation("content_type is required".to_string()))?;

    let content_type: ContentType = declared_type
        .parse()
        .map_err(|_| invalid_media_type(&declared_type))?;
    let kind = content_type
        .media_kind()
        .ok_or_else(|| invalid_media_type(&declared_type))?;

    tracing::info!(%filename, size_bytes, content_type = %content_type, "Processing file verification request");

    let media = media::validate_upload(kind, &filename, size_bytes)?;
    let assessment = state.classifier.assess_media(&media);

    let record = build_record(content_type, source_url, &assessment);
    state.repository.insert(&record).await?;

    tracing::info!(verification_id = %record.id, "Verification completed");
    Ok(Json(respond(record)))
}

#[tracing::instrument(skip(state))]
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VerificationSummary>, ApiError> {
    let record = state
        .repository
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("verification {id} not found")))?;

    Ok(Json(summarize(record)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[tracing::instrument(skip(state))]
pub async fn list_verifications(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<VerificationListResponse>, ApiError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);

    let records = state.repository.list(limit, offset).await?;
    let data: Vec<VerificationSummary> = records.into_iter().map(summarize).collect();
    let count = data.len();

    Ok(Json(VerificationListResponse { data, count }))
}

fn invalid_media_type(declared: &str) -> ApiError {
    ApiError::Validation(format!(
        "invalid content type: {declared}. must be 'image' or 'video'"
    ))
}

fn build_record(
    content_type: ContentType,
    source_url: Option<String>,
    assessment: &Assessment,
) -> VerificationRecord {
    let now = Utc::now();
    VerificationRecord {
        id: Uuid::new_v4().to_string(),
        content_type: content_type.as_str().to_string(),
        source_url,
        status: STATUS_COMPLETED.to_string(),
        classification: assessment.verdict.label().to_string(),
        confidence: assessment.confidence,
        explanation: assessment.explanation.clone(),
        sources: assessment.sources.clone(),
        created_at: now,
        updated_at: now,
    }
}

fn respond(record: VerificationRecord) -> VerifyResponse {
    VerifyResponse {
        verification_id: record.id,
        status: record.status,
        confidence: record.confidence,
        classification: record.classification,
        explanation: record.explanation,
        sources: record.sources,
    }
}

fn summarize(record: VerificationRecord) -> VerificationSummary {
    VerificationSummary {
        verification_id: record.id,
        status: record.status,
        content_type: record.content_type,
        classification: record.classification,
        confidence: record.confidence,
        created_at: record.created_at,
    }
}
