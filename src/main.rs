use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_funnel_api::config::Config;
use rust_funnel_api::dashboard::DashboardStore;
use rust_funnel_api::db::Database;
use rust_funnel_api::handlers::{self, AppState};
use rust_funnel_api::influencers::InfluencerStore;
use rust_funnel_api::interactions::InteractionStore;
use rust_funnel_api::leads::LeadStore;
use rust_funnel_api::sales::SaleStore;
use rust_funnel_api::users::UserStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_funnel_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool and run migrations
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    let pool = db.pool.clone();
    let app_state = Arc::new(AppState {
        config: config.clone(),
        leads: LeadStore::new(pool.clone()),
        interactions: InteractionStore::new(pool.clone()),
        sales: SaleStore::new(pool.clone()),
        influencers: InfluencerStore::new(pool.clone()),
        users: UserStore::new(pool.clone()),
        dashboard: DashboardStore::new(pool),
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    let protected_routes = Router::new()
        // Leads
        .route("/api/v1/leads", post(handlers::create_lead))
        .route("/api/v1/leads", get(handlers::list_leads))
        .route("/api/v1/leads/:id", get(handlers::get_lead))
        .route("/api/v1/leads/:id", patch(handlers::update_lead))
        .route("/api/v1/leads/:id", delete(handlers::delete_lead))
        .route(
            "/api/v1/leads/:id/interactions",
            get(handlers::list_lead_interactions),
        )
        // Interactions
        .route("/api/v1/interactions", post(handlers::record_interaction))
        .route("/api/v1/interactions", get(handlers::list_interactions))
        .route(
            "/api/v1/interactions/my",
            get(handlers::list_my_interactions),
        )
        .route("/api/v1/interactions/:id", get(handlers::get_interaction))
        // Sales
        .route("/api/v1/sales/convert", post(handlers::convert_lead))
        .route("/api/v1/sales", get(handlers::list_sales))
        .route("/api/v1/sales/my", get(handlers::list_my_sales))
        .route("/api/v1/sales/:id", get(handlers::get_sale))
        // Influencers and source codes
        .route("/api/v1/influencers", post(handlers::create_influencer))
        .route("/api/v1/influencers", get(handlers::list_influencers))
        .route(
            "/api/v1/influencers/active",
            get(handlers::list_active_influencers),
        )
        .route("/api/v1/influencers/:id", get(handlers::get_influencer))
        .route("/api/v1/influencers/:id", patch(handlers::update_influencer))
        .route(
            "/api/v1/influencers/:id",
            delete(handlers::delete_influencer),
        )
        .route(
            "/api/v1/influencers/:id/source-codes",
            post(handlers::add_source_code),
        )
        // Users
        .route("/api/v1/users", post(handlers::create_user))
        .route("/api/v1/users", get(handlers::list_users))
        .route("/api/v1/users/:id", get(handlers::get_user))
        .route("/api/v1/users/:id", patch(handlers::update_user))
        .route("/api/v1/users/:id", delete(handlers::delete_user))
        // Dashboard
        .route(
            "/api/v1/dashboard/admin-summary",
            get(handlers::admin_summary),
        )
        .route(
            "/api/v1/dashboard/executives-performance",
            get(handlers::executives_performance),
        )
        .route(
            "/api/v1/dashboard/influencer-sales",
            get(handlers::influencer_sales),
        )
        .route("/api/v1/dashboard/my-summary", get(handlers::my_summary))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 1MB max payload
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting so orchestrator probes never 429
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
