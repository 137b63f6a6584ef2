use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use forum_api::auth::TokenKeys;
use forum_api::config::AppConfig;
use forum_api::ids::RandomIdGenerator;
use forum_api::openapi::ApiDoc;
use forum_api::repo::UserRepo;
use forum_api::{config, AppState};

#[cfg(not(any(feature = "inmem-store", feature = "postgres-store")))]
compile_error!("enable at least one of the `inmem-store` or `postgres-store` features");

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = AppConfig::from_env().context("invalid configuration")?;
    info!("Bootstrapping forum API");

    #[cfg(feature = "postgres-store")]
    let repo = {
        use sqlx::postgres::PgPoolOptions;
        let db_url = cfg.database_url.as_deref().context("DATABASE_URL must be set for postgres-store")?;
        let pool = PgPoolOptions::new()
            .max_connections(cfg.db_max_connections)
            .connect_lazy(db_url)
            .context("failed to create Postgres pool")?;
        let repo = forum_api::repo::pg::PgRepo::new(pool, Arc::new(RandomIdGenerator));
        if cfg.run_migrations {
            repo.migrate().await.context("failed to run migrations")?;
            info!("Migrations applied");
        }
        info!("Using Postgres repository backend");
        repo
    };

    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    let repo = {
        info!("Using in-memory repository backend");
        forum_api::repo::inmem::InMemRepo::new(Arc::new(RandomIdGenerator))
    };

    for user in &cfg.seed_users {
        match repo.add_user(user.clone()).await {
            Ok(u) => info!(user_id = %u.id, username = %u.username, "seeded user"),
            Err(e) => warn!(user_id = %user.id, error = %e, "skipping seed user"),
        }
    }

    let state = web::Data::new(AppState::new(Arc::new(repo)));
    let keys = web::Data::new(TokenKeys::new(&cfg.jwt_secret));
    let openapi = ApiDoc::openapi();
    let frontend_url = cfg.frontend_url.clone();

    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allow_any_header()
            .allowed_methods(["GET", "POST", "DELETE", "OPTIONS"])
            .max_age(3600);
        if let Some(front) = &frontend_url {
            cors = cors.allowed_origin(front);
        }

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(cors)
            .app_data(state.clone())
            .app_data(keys.clone())
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(&cfg.bind_addr)
    .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;

    info!("Listening on http://{}", cfg.bind_addr);
    server.run().await?;
    Ok(())
}
