use crate::config::{ServeConfig, REGISTERED_MODELS};
use crate::error::{ErrorBody, PredictionError};
use crate::features::category_store::{CategoryError, CategoryStore};
use crate::features::frame::Record;
use crate::model::model_manager::ModelRegistry;
use crate::model::model_utils::ModelKind;
use actix_cors::Cors;
use actix_web::error::InternalError;
use actix_web::{middleware, web, App, HttpResponse, HttpServer, Responder};
use anyhow::Context;
use actix_web::http::Uri;
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct PredictionRequest {
    pub requested_model: String,
    pub data: Vec<Record>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PredictionResponse {
    pub predictions: Vec<String>,
}

#[derive(Serialize)]
struct WelcomeResponse {
    message: String,
}

#[derive(Serialize)]
struct ModelPresentable {
    name: String,
    kind: ModelKind,
}

#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<ModelPresentable>,
}

async fn welcome() -> impl Responder {
    let response = WelcomeResponse {
        message: "Welcome to the Multi-Model Prediction API".to_string(),
    };
    HttpResponse::Ok().json(response)
}

async fn get_models(registry: web::Data<ModelRegistry>) -> impl Responder {
    let models = registry
        .models()
        .into_iter()
        .map(|(name, kind)| ModelPresentable { name, kind })
        .collect();
    HttpResponse::Ok().json(ModelsResponse { models })
}

async fn predict(
    registry: web::Data<ModelRegistry>,
    request: web::Json<PredictionRequest>,
) -> Result<HttpResponse, PredictionError> {
    let PredictionRequest {
        requested_model,
        data,
    } = request.into_inner();
    debug!(
        "prediction requested from '{}' for {} records",
        requested_model,
        data.len()
    );

    let predictions = web::block(move || registry.predict(&requested_model, &data))
        .await
        .map_err(|e| PredictionError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(PredictionResponse { predictions }))
}

async fn get_categories(
    registry: web::Data<ModelRegistry>,
    model_name: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let model_name = model_name.into_inner();
    let store: CategoryStore = registry.categories().clone();
    let spec = web::block(move || store.load(&model_name))
        .await?
        .map_err(|e: CategoryError| actix_web::Error::from(e))?;
    Ok(HttpResponse::Ok().json(spec))
}

/// Routes of the prediction API. The caller provides the registry as
/// `web::Data<ModelRegistry>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let body = ErrorBody {
            detail: err.to_string(),
        };
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    }))
    .route("/", web::get().to(welcome))
    .route("/models", web::get().to(get_models))
    .route("/predict", web::post().to(predict))
    .route("/categories/{model_name}", web::get().to(get_categories));
}

/// Checks that every CORS origin is a `scheme://host[:port]` URL.
pub fn validate_origins(allowed_origins: &[String]) -> anyhow::Result<()> {
    for origin in allowed_origins {
        let uri: Uri = origin
            .parse()
            .with_context(|| format!("invalid allowed origin '{origin}'"))?;
        if uri.scheme().is_none() || uri.host().is_none() {
            anyhow::bail!("invalid allowed origin '{origin}': expected scheme://host[:port]");
        }
    }
    Ok(())
}

pub fn cors(allowed_origins: &[String]) -> Cors {
    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
}

pub async fn run_server(config: ServeConfig) -> anyhow::Result<()> {
    validate_origins(&config.allowed_origins).context("refusing to serve")?;
    let registry = ModelRegistry::load(
        &config.models_dir,
        CategoryStore::new(config.categories_dir.clone()),
        REGISTERED_MODELS,
    )
    .await
    .context("model registry failed to load, refusing to serve")?;
    let shared_registry = web::Data::new(registry);
    let allowed_origins = config.allowed_origins.clone();

    info!(
        "serving {} models on {}:{}",
        REGISTERED_MODELS.len(),
        config.host,
        config.port
    );
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&allowed_origins))
            .wrap(middleware::Logger::default())
            .app_data(shared_registry.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
