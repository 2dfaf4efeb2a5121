use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;

use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use log::{debug, error, info};
use structopt::StructOpt;

mod config;
mod cors;
mod response;
mod service;
mod upload;

use config::Config;
use cors::CorsPolicy;
use service::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_args();
    config.validate()?;
    debug!("{:?}", config);

    let classifier = match config.load_classifier() {
        Ok(classifier) => Arc::new(classifier),
        Err(err) => {
            error!("Error loading model: {}", err);
            return Err(err.into());
        }
    };
    info!(
        "Model loaded, {} labels, {}x{} input",
        classifier.labels().len(),
        config.image_size,
        config.image_size
    );

    let state = Arc::new(AppState {
        classifier,
        cors: CorsPolicy::new(&config.origins())?,
        max_upload_bytes: config.max_upload_bytes,
        timeout: config.request_timeout(),
    });

    let make_service = make_service_fn(move |conn: &AddrStream| {
        debug!("Connection from {}", conn.remote_addr());

        let state = Arc::clone(&state);
        let service = service_fn(move |req| service::handle(req, Arc::clone(&state)));

        async move { Ok::<_, Infallible>(service) }
    });

    let server = Server::try_bind(&config.bind)?
        .serve(make_service)
        .with_graceful_shutdown(shutdown_signal());

    info!("Listening on http://{}", config.bind);

    if let Err(e) = server.await {
        error!("server error: {}", e);
        return Err(e.into());
    }

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Could not install Ctrl-C handler: {}", e);
        // keep serving rather than exiting immediately
        futures::future::pending::<()>().await;
    }
}
