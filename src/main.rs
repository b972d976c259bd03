mod handlers;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;

use services::analytics::{Analytics, LogAnalytics};
use services::github::{Forwarder, ProxyForwarder};
use services::narrative::{GeminiNarrativeGenerator, NarrativeGenerator};
use services::snapshot::{PipelineConfig, SnapshotBuilder};
use utils::{config::Config, http_client::create_http_client};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file FIRST before anything else
    dotenv::dotenv().ok();

    // Initialize logger with default level if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=================================================");
    println!("🚀 devwrapped Server");
    println!("=================================================");

    let config = Config::from_env().expect("Failed to load configuration");
    let host = config.host.clone();
    let port = config.port;

    println!("📝 Configuration loaded:");
    println!("   - Host: {}", host);
    println!("   - Port: {}", port);
    println!("   - GitHub API: {}", config.github_api_base_url);
    println!(
        "   - Budget: {}ms ({}ms platform limit, {}ms buffer)",
        config.platform_budget().as_millis(),
        config.platform_timeout_ms,
        config.timeout_buffer_ms
    );
    println!(
        "   - Narrative: {}",
        if config.gemini_api_key.is_some() {
            "ENABLED"
        } else {
            "DISABLED (GEMINI_API_KEY not set)"
        }
    );
    println!(
        "   - Log level: {}",
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    );

    let http = create_http_client().expect("Failed to build HTTP client");

    let forwarder: Arc<dyn Forwarder> = Arc::new(ProxyForwarder::from_config(http.clone(), &config));
    let builder = web::Data::new(SnapshotBuilder::new(
        forwarder.clone(),
        PipelineConfig::from_config(&config),
    ));
    let narrative: Arc<dyn NarrativeGenerator> =
        Arc::new(GeminiNarrativeGenerator::from_config(http, &config));
    let analytics: Arc<dyn Analytics> = Arc::new(LogAnalytics);

    let forwarder = web::Data::from(forwarder);
    let narrative = web::Data::from(narrative);
    let analytics = web::Data::from(analytics);

    println!("🌐 Starting HTTP server at http://{}:{}", host, port);
    println!("📍 Available endpoints:");
    println!("   - POST http://{}:{}/api/github-proxy", host, port);
    println!("   - POST http://{}:{}/api/wrapped", host, port);
    println!("   - POST http://{}:{}/api/insights", host, port);
    println!("   - GET  http://{}:{}/health", host, port);
    println!("=================================================");

    log::info!("Server started at http://{}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_origin(&config.frontend_url)
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
            ])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(forwarder.clone())
            .app_data(builder.clone())
            .app_data(narrative.clone())
            .app_data(analytics.clone())
            .wrap(Logger::default())
            .wrap(cors) // CORS must be wrapped AFTER Logger to ensure headers are added to all responses
            .service(
                web::scope("/api")
                    .route(
                        "/github-proxy",
                        web::post().to(handlers::github_proxy::forward),
                    )
                    .route("/wrapped", web::post().to(handlers::wrapped::build_stats))
                    .route(
                        "/insights",
                        web::post().to(handlers::wrapped::generate_insights),
                    ),
            )
            .route("/health", web::get().to(handlers::wrapped::health))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
