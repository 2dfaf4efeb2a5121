use std::convert::Infallible;
use std::future::Future;

use futures::FutureExt;
use hyper::header::{HeaderValue, InvalidHeaderValue, CONTENT_TYPE, ORIGIN};
use hyper::{Body, Method, Request, Response};
use tower::{service_fn, Layer, ServiceExt};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Cross-origin rules for `/predict`. Other routes are served without them.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    layer: CorsLayer,
    default_origin: Option<HeaderValue>,
}

impl CorsPolicy {
    pub fn new(origins: &[String]) -> Result<Self, InvalidHeaderValue> {
        let origins = origins
            .iter()
            .map(|o| HeaderValue::from_str(o))
            .collect::<Result<Vec<_>, _>>()?;

        let layer = CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins.clone()))
            .allow_methods([Method::POST])
            .allow_headers([CONTENT_TYPE])
            .allow_credentials(true);

        Ok(CorsPolicy {
            layer,
            default_origin: origins.into_iter().next(),
        })
    }

    /// Run `handler` behind the CORS layer.
    ///
    /// `OPTIONS` requests are answered by the layer and never reach `handler`.
    /// A preflight without an `Origin` header is answered for the first
    /// allowed origin.
    pub async fn serve<F, Fut>(&self, mut req: Request<Body>, handler: F) -> Response<Body>
    where
        F: FnMut(Request<Body>) -> Fut,
        Fut: Future<Output = Response<Body>>,
    {
        if req.method() == Method::OPTIONS && !req.headers().contains_key(ORIGIN) {
            if let Some(origin) = &self.default_origin {
                req.headers_mut().insert(ORIGIN, origin.clone());
            }
        }

        let mut handler = handler;
        let inner = service_fn(move |req| handler(req).map(Ok::<_, Infallible>));

        match self.layer.layer(inner).oneshot(req).await {
            Ok(resp) => resp,
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ORIGINS;
    use hyper::header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
        ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    };
    use hyper::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy() -> CorsPolicy {
        let origins: Vec<String> = DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect();
        CorsPolicy::new(&origins).unwrap()
    }

    fn request(method: Method, origin: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri("/predict");
        if let Some(origin) = origin {
            builder = builder.header(ORIGIN, origin);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn ok(_req: Request<Body>) -> Response<Body> {
        Response::new(Body::from("ok"))
    }

    fn allow_origin(resp: &Response<Body>) -> Option<&str> {
        resp.headers()
            .get(ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn preflight_without_origin_advertises_the_first_origin() {
        let calls = AtomicUsize::new(0);
        let resp = policy()
            .serve(request(Method::OPTIONS, None), |req| {
                calls.fetch_add(1, Ordering::SeqCst);
                ok(req)
            })
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(allow_origin(&resp), Some("http://localhost:3000"));
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_METHODS], "POST");
        assert!(resp.headers()[ACCESS_CONTROL_ALLOW_HEADERS]
            .to_str()
            .unwrap()
            .eq_ignore_ascii_case("content-type"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn preflight_echoes_an_allowed_origin() {
        let resp = policy()
            .serve(request(Method::OPTIONS, Some("http://127.0.0.1:3000")), ok)
            .await;

        assert_eq!(allow_origin(&resp), Some("http://127.0.0.1:3000"));
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn unknown_origins_get_no_allow_header() {
        let p = policy();

        let resp = p
            .serve(request(Method::OPTIONS, Some("https://evil.example")), ok)
            .await;
        assert_eq!(allow_origin(&resp), None);

        let resp = p
            .serve(request(Method::POST, Some("https://evil.example")), ok)
            .await;
        assert_eq!(allow_origin(&resp), None);

        let resp = p.serve(request(Method::POST, None), ok).await;
        assert_eq!(allow_origin(&resp), None);
    }

    #[tokio::test]
    async fn actual_requests_reach_the_handler_and_echo_allowed_origins() {
        let resp = policy()
            .serve(request(Method::POST, Some("http://localhost:3000")), ok)
            .await;

        assert_eq!(allow_origin(&resp), Some("http://localhost:3000"));
        let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[test]
    fn invalid_origin_is_rejected_up_front() {
        assert!(CorsPolicy::new(&["http://bad\norigin".to_owned()]).is_err());
    }
}
