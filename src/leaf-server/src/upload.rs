use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Request, StatusCode};
use multer::{Constraints, Multipart, SizeLimit};

use crate::response::ErrorResponse;

/// Multipart field that carries the image.
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub data: Bytes,
}

#[derive(Debug, PartialEq)]
pub enum UploadError {
    /// No file field named `image`; carries the file fields that were sent.
    MissingField(Vec<String>),
    EmptyFilename,
    EmptyContent,
    TooLarge(u64),
    Malformed(String),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn body(self) -> ErrorResponse {
        match self {
            UploadError::MissingField(received) => {
                ErrorResponse::new("No file part in request").with_received_files(received)
            }
            UploadError::EmptyFilename => ErrorResponse::new("No selected file"),
            UploadError::EmptyContent => ErrorResponse::new("Empty file content"),
            UploadError::TooLarge(limit) => {
                ErrorResponse::new(format!("Upload exceeds the limit of {} bytes", limit))
            }
            UploadError::Malformed(msg) => {
                ErrorResponse::new(format!("Malformed multipart request: {}", msg))
            }
        }
    }
}

impl From<multer::Error> for UploadError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { limit }
            | multer::Error::FieldSizeExceeded { limit, .. } => UploadError::TooLarge(limit),
            // the whole-stream cap surfaces wrapped in a read failure
            multer::Error::StreamReadFailed(inner) => match inner.downcast_ref::<multer::Error>() {
                Some(multer::Error::StreamSizeExceeded { limit })
                | Some(multer::Error::FieldSizeExceeded { limit, .. }) => {
                    UploadError::TooLarge(*limit)
                }
                _ => UploadError::Malformed(multer::Error::StreamReadFailed(inner).to_string()),
            },
            other => UploadError::Malformed(other.to_string()),
        }
    }
}

/// Pull the `image` file out of a multipart request and validate it.
///
/// At most `limit` bytes of body are read. Anything that is not
/// `multipart/form-data` is treated as a request without file parts.
pub async fn extract_image(req: Request<Body>, limit: u64) -> Result<Upload, UploadError> {
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok());

    let boundary = match boundary {
        Some(b) => b,
        None => return Err(UploadError::MissingField(Vec::new())),
    };

    let constraints = Constraints::new().size_limit(
        SizeLimit::new()
            .whole_stream(limit)
            .for_field(IMAGE_FIELD, limit),
    );
    let mut multipart = Multipart::with_constraints(req.into_body(), boundary, constraints);

    let mut received = Vec::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        // plain form values are not files
        let filename = match field.file_name() {
            Some(f) => f.to_owned(),
            None => continue,
        };
        let name = field.name().unwrap_or_default().to_owned();

        if name == IMAGE_FIELD && image.is_none() {
            image = Some(Upload {
                filename,
                data: field.bytes().await?,
            });
        }
        received.push(name);
    }

    let upload = image.ok_or(UploadError::MissingField(received))?;
    check_filename(&upload)?;
    check_content(&upload)?;

    Ok(upload)
}

fn check_filename(upload: &Upload) -> Result<(), UploadError> {
    if upload.filename.is_empty() {
        return Err(UploadError::EmptyFilename);
    }
    Ok(())
}

fn check_content(upload: &Upload) -> Result<(), UploadError> {
    if upload.data.is_empty() {
        return Err(UploadError::EmptyContent);
    }
    Ok(())
}
