use std::sync::Arc;

use anyhow::Context;
use aws_config::BehaviorVersion;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use domain::{
    intake::{
        self,
        cqrs::DynamoIntakeStore,
        inputs::{AddManualItemInput, EditItemInput, EnterPhoneInput, PrescriptionTextInput},
        Command, HttpExtractor, HttpSubmissionSink, IntakeWizard, ItemChange, ItemId,
    },
    Error, Messages, Settings,
};

type ApiError = (StatusCode, String);

#[derive(Clone)]
struct AppState {
    wizard: Arc<IntakeWizard<DynamoIntakeStore>>,
    settings: Arc<Settings>,
}

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let state = build_state().await?;

    let app = Router::new()
        .route("/intakes", post(start_intake))
        .route("/intakes/:id", get(get_intake))
        .route("/intakes/:id/prescription", put(update_prescription))
        .route("/intakes/:id/extract", post(extract))
        .route("/intakes/:id/items", post(add_item))
        .route(
            "/intakes/:id/items/:item_id",
            patch(edit_item).delete(delete_item),
        )
        .route("/intakes/:id/items/:item_id/validate", post(toggle_item))
        .route("/intakes/:id/phone-step", post(proceed_to_phone))
        .route("/intakes/:id/back", post(return_to_prescription))
        .route("/intakes/:id/edit-items", post(return_to_validation))
        .route("/intakes/:id/phone", put(enter_phone))
        .route("/intakes/:id/submit", post(submit))
        .route("/intakes/:id/reset", post(reset))
        .with_state(state);

    let app = tower::ServiceBuilder::new()
        .layer(axum_aws_lambda::LambdaLayer::default())
        .service(app);

    lambda_http::run(app).await?;
    Ok(())
}

async fn build_state() -> anyhow::Result<AppState> {
    let settings = Settings::from_env().context("invalid settings")?;
    tracing::info!(
        "Extractor at {}, submissions to {}, language {}",
        settings.extractor_url,
        settings.submission_url,
        settings.language
    );

    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let dynamodb_client = aws_sdk_dynamodb::Client::new(&config);

    let intakes_repo = intake::cqrs::init_repo(dynamodb_client.clone());
    let intakes_cqrs = intake::cqrs::init(dynamodb_client, intakes_repo.clone());

    let extractor = HttpExtractor::new(settings.extractor_url.clone(), settings.extractor_timeout);
    if !extractor.health_check().await {
        tracing::warn!("Extractor at {} is not responding", extractor.base_url());
    }

    let wizard = IntakeWizard::new(
        intakes_cqrs,
        intakes_repo,
        Arc::new(extractor),
        Arc::new(HttpSubmissionSink::new(settings.submission_url.clone())),
        Messages::new(settings.language),
    );

    Ok(AppState {
        wizard: Arc::new(wizard),
        settings: Arc::new(settings),
    })
}

fn api_error(err: Error) -> ApiError {
    let status = match &err {
        Error::NotFound { .. } | Error::ItemNotFound { .. } => StatusCode::NOT_FOUND,
        Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Gate { .. }
        | Error::WrongStep { .. }
        | Error::InvalidStateTransition { .. }
        | Error::Uniqueness { .. } => StatusCode::CONFLICT,
        Error::Extraction { .. } | Error::Submission { .. } => StatusCode::BAD_GATEWAY,
        Error::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

// Run a command and answer with the updated view
async fn run(state: &AppState, id: &str, command: Command) -> Result<impl IntoResponse, ApiError> {
    state.wizard.execute(id, command).await.map_err(api_error)?;
    let view = state.wizard.load(id).await.map_err(api_error)?;
    Ok(Json(view))
}

// Start intake
async fn start_intake(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let id = state.wizard.start().await.map_err(api_error)?;
    let view = state.wizard.load(&id).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(view)))
}

// Get intake
async fn get_intake(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.wizard.load(&id).await.map_err(api_error)?;
    Ok(Json(view))
}

async fn update_prescription(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<PrescriptionTextInput>,
) -> Result<impl IntoResponse, ApiError> {
    run(&state, &id, Command::UpdatePrescriptionText { text: input.text }).await
}

// Extraction failures come back as a 200 with the error on the view
async fn extract(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<PrescriptionTextInput>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.wizard.extract(&id, &input.text).await.map_err(api_error)?;
    Ok(Json(view))
}

async fn add_item(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<AddManualItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    run(&state, &id, input.into()).await
}

async fn edit_item(
    Path((id, item_id)): Path<(String, u64)>,
    State(state): State<AppState>,
    Json(input): Json<EditItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    let change = ItemChange::try_from(input).map_err(api_error)?;
    let command = Command::EditItem {
        item_id: ItemId(item_id),
        change,
    };
    run(&state, &id, command).await
}

async fn delete_item(
    Path((id, item_id)): Path<(String, u64)>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    run(&state, &id, Command::DeleteItem { item_id: ItemId(item_id) }).await
}

async fn toggle_item(
    Path((id, item_id)): Path<(String, u64)>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    run(&state, &id, Command::ToggleItemValidation { item_id: ItemId(item_id) }).await
}

async fn proceed_to_phone(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    run(&state, &id, Command::ProceedToPhone).await
}

async fn return_to_prescription(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    run(&state, &id, Command::ReturnToPrescription).await
}

async fn return_to_validation(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    run(&state, &id, Command::ReturnToValidation).await
}

async fn enter_phone(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<EnterPhoneInput>,
) -> Result<impl IntoResponse, ApiError> {
    let command = input.into_command(&state.settings.default_dial_code);
    run(&state, &id, command).await
}

async fn submit(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.wizard.submit(&id).await.map_err(api_error)?;
    Ok(Json(view))
}

async fn reset(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    run(&state, &id, Command::ResetIntake).await
}
