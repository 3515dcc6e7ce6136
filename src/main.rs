use actix_cors::Cors;
use actix_files::Files;
use actix_session::{storage::CookieSessionStore, SessionExt, SessionMiddleware};
use actix_web::{
    cookie::Key,
    guard,
    middleware::{DefaultHeaders, Logger},
    web, App, HttpResponse, HttpServer, Responder,
};
use clap::Parser;
use fitbase_backend::{
    auth::AuthService,
    config::Config,
    middleware::admin_guard,
    routes,
    store::{local::LocalCache, remote::RemoteBackend, CmsStore, ModeFlag, StoreMode},
};
use std::convert::TryFrom;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// A simple handler for the root URL.
async fn root_handler() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

#[derive(Parser, Debug)]
#[command(name = "fitbase_server", author, version, about = "Starts the fitness-site backend server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    fs::create_dir_all(&config.cache_path).expect("Failed to create cache directory");
    fs::create_dir_all(&config.media_path).expect("Failed to create media directory");

    let local = Arc::new(
        LocalCache::open(&config.cache_db_path()).expect("FATAL: Failed to open cache database."),
    );

    // Mode selection happens once: remote when the backend is configured,
    // local otherwise. Runtime failures can only downgrade it.
    let remote = config.remote().map(|settings| {
        log::info!("Remote backend configured at {}", settings.url);
        Arc::new(RemoteBackend::new(settings))
    });
    let initial_mode = if remote.is_some() {
        StoreMode::Remote
    } else {
        StoreMode::Local
    };
    let mode = Arc::new(ModeFlag::new(initial_mode));

    let cms = CmsStore::open(local.clone(), remote.clone(), mode.clone())
        .await
        .expect("FATAL: Failed to load content collections.");
    let auth = AuthService::open(local, remote, mode)
        .await
        .expect("FATAL: Failed to load user collections.");
    log::info!("Persistence layer running in {} mode.", cms.mode().as_str());

    let cms_data = web::Data::new(cms);
    let auth_data = web::Data::new(auth);

    let session_key_bytes = hex::decode(&config.session_secret_key)
        .expect("FATAL: SESSION_SECRET_KEY in .env is not a valid hex string.");
    let session_key = Key::try_from(session_key_bytes.as_slice())
        .expect("FATAL: The decoded SESSION_SECRET_KEY is not long enough (minimum 64 bytes required).");

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    println!("🚀 Server starting at http://{}", server_address);

    HttpServer::new(move || {
        let session_mw =
            SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                .cookie_secure(config.use_secure_cookies)
                .cookie_http_only(true)
                .cookie_same_site(actix_web::cookie::SameSite::Lax)
                .build();

        let cors = {
            let allowed_origins_str = &config.allowed_origins;
            if allowed_origins_str.trim() == "*" {
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .supports_credentials()
                    .max_age(3600)
            } else {
                let mut cors = Cors::default();
                let origins: Vec<&str> = allowed_origins_str
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .collect();
                for origin in origins {
                    cors = cors.allowed_origin(origin);
                }
                cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .supports_credentials()
                    .max_age(3600)
            }
        };

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            .app_data(web::Data::new(config.clone()))
            .app_data(cms_data.clone())
            .app_data(auth_data.clone())
            .configure(routes::public::config_api)
            .service(Files::new("/media", &config.media_path))
            .route("/", web::get().to(root_handler))
            .service(
                web::scope("/admin")
                    .wrap(session_mw)
                    .configure(routes::admin::config_auth)
                    .service(
                        web::scope("")
                            .guard(guard::fn_guard(|ctx| admin_guard(&ctx.get_session())))
                            .configure(routes::admin::config_panel),
                    ),
            )
    })
    .bind(server_address)?
    .run()
    .await
}
