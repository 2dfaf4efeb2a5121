use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use hyper::{Body, Method, Request, Response, StatusCode};
use leaf_serve::{ClassifyError, ImageClassifier, Timer};
use log::{error, info, warn};

use crate::cors::CorsPolicy;
use crate::response::{html, json, ErrorResponse, PredictResponse};
use crate::upload::extract_image;

const INDEX_PAGE: &str = r#"<!doctype html>
<html>
  <head><title>Tea-Leaf Disease Classifier</title></head>
  <body>
    <h2>Tea-Leaf Disease Classifier</h2>
    <form action="/predict" method="post" enctype="multipart/form-data">
      <input type="file" name="image" accept="image/*"><br><br>
      <input type="submit" value="Predict">
    </form>
  </body>
</html>
"#;

const INVALID_IMAGE: &str = "Invalid image file. Please upload a valid image.";

/// Everything a request handler needs. Built once in `main`.
pub struct AppState {
    pub classifier: Arc<ImageClassifier>,
    pub cors: CorsPolicy,
    pub max_upload_bytes: u64,
    pub timeout: Duration,
}

pub async fn handle(
    req: Request<Body>,
    state: Arc<AppState>,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let resp = match (&method, path.as_str()) {
        (&Method::GET, "/") => html(INDEX_PAGE),
        (&Method::OPTIONS, "/predict") | (&Method::POST, "/predict") => {
            let route_state = Arc::clone(&state);
            state
                .cors
                .serve(req, move |req| guarded_predict(req, Arc::clone(&route_state)))
                .await
        }
        (_, "/") | (_, "/predict") => {
            ErrorResponse::new("Method not allowed").into_response(StatusCode::METHOD_NOT_ALLOWED)
        }
        _ => ErrorResponse::new("Not found").into_response(StatusCode::NOT_FOUND),
    };

    Ok(resp)
}

async fn guarded_predict(req: Request<Body>, state: Arc<AppState>) -> Response<Body> {
    match AssertUnwindSafe(predict(req, &state)).catch_unwind().await {
        Ok(resp) => resp,
        Err(panic) => server_error(&panic_message(&*panic)),
    }
}

async fn predict(req: Request<Body>, state: &AppState) -> Response<Body> {
    info!("Received prediction request");

    let upload = match extract_image(req, state.max_upload_bytes).await {
        Ok(upload) => upload,
        Err(err) => {
            let status = err.status();
            let body = err.body();
            warn!("Rejected upload: {}", body.error);
            return body.into_response(status);
        }
    };

    info!(
        "Processing file: {} ({} bytes)",
        upload.filename,
        upload.data.len()
    );

    let mut t = Timer::started("Handling request");

    let classifier = Arc::clone(&state.classifier);
    let data = upload.data;
    let work = tokio::task::spawn_blocking(move || classifier.classify_from_raw(&data));

    let outcome = match tokio::time::timeout(state.timeout, work).await {
        Err(_) => Err(ClassifyError::Timeout(state.timeout)),
        Ok(Err(join)) => {
            let msg = if join.is_panic() {
                panic_message(&*join.into_panic())
            } else {
                join.to_string()
            };
            t.stop();
            return server_error(&msg);
        }
        Ok(Ok(outcome)) => outcome,
    };

    t.stop();

    match outcome {
        Ok(classification) => json(StatusCode::OK, &PredictResponse::new(&classification)),
        Err(err @ ClassifyError::InvalidImage(_)) => {
            error!("Invalid image file {}: {}", upload.filename, err);
            ErrorResponse::new(INVALID_IMAGE).into_response(StatusCode::BAD_REQUEST)
        }
        Err(err) if err.is_client_error() => {
            error!("Rejected image {}: {}", upload.filename, err);
            ErrorResponse::new(format!("Invalid image file. {}", err))
                .into_response(StatusCode::BAD_REQUEST)
        }
        Err(err) => {
            error!("Error processing image {}: {}", upload.filename, err);
            ErrorResponse::new(format!("Error processing image: {}", err))
                .into_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn server_error(msg: &str) -> Response<Body> {
    error!("Server error: {}", msg);
    ErrorResponse::new(format!("Server error: {}", msg))
        .into_response(StatusCode::INTERNAL_SERVER_ERROR)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "request handler panicked".to_owned()
    }
}
