use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Response, StatusCode};
use leaf_serve::Classification;
use log::error;
use serde::Serialize;

#[derive(Serialize)]
pub struct PredictResponse<'a> {
    pub success: bool,
    #[serde(flatten)]
    pub classification: &'a Classification,
}

impl<'a> PredictResponse<'a> {
    pub fn new(classification: &'a Classification) -> Self {
        PredictResponse {
            success: true,
            classification,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    /// Names of the file fields that did arrive, when the expected one didn't.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_files: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorResponse {
            success: false,
            error: error.into(),
            received_files: None,
        }
    }

    pub fn with_received_files(mut self, files: Vec<String>) -> Self {
        self.received_files = Some(files);
        self
    }

    pub fn into_response(self, status: StatusCode) -> Response<Body> {
        json(status, &self)
    }
}

pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut resp = Response::new(Body::from(bytes));
            *resp.status_mut() = status;
            resp.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            resp
        }
        Err(err) => {
            error!("Could not serialize response: {}", err);
            let mut resp = Response::new(Body::from("Server error"));
            *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            resp
        }
    }
}

pub fn html(body: &'static str) -> Response<Body> {
    let mut resp = Response::new(Body::from(body));
    resp.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    resp
}
