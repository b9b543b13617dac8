//! ripple server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use ripple_api::{StreamingState, middleware::AppState, router as api_router, streaming_handler};
use ripple_common::Config;
use ripple_core::{
    CommentService, EventPublisherService, LikeService, NotificationService, PostService,
    UserService,
};
use ripple_db::repositories::{
    CommentRepository, LikeRepository, NotificationRepository, PostRepository, UserRepository,
};
use ripple_realtime::{PubSubStreamBridge, RedisPubSub};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ripple=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting ripple server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = ripple_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    ripple_db::migrate(&db).await?;
    info!("Migrations completed");

    // Connect to Redis Pub/Sub and start the subscriber loop
    let pubsub = Arc::new(RedisPubSub::new(&config.redis.url).await?);
    pubsub.start().await?;
    let event_publisher: EventPublisherService = pubsub.clone();
    info!("Connected to Redis Pub/Sub");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let like_repo = LikeRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));

    // Initialize services. The notification service gets its publisher
    // before the mutation services clone it, so every path shares it.
    let user_service = UserService::new(user_repo.clone());

    let mut notification_service = NotificationService::new(
        notification_repo,
        post_repo.clone(),
        user_repo.clone(),
        comment_repo.clone(),
    );
    notification_service.set_event_publisher(event_publisher.clone());

    let mut post_service = PostService::new(
        post_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
    );
    post_service.set_event_publisher(event_publisher.clone());

    let mut like_service = LikeService::new(
        like_repo,
        post_repo.clone(),
        notification_service.clone(),
    );
    like_service.set_event_publisher(event_publisher.clone());

    let mut comment_service = CommentService::new(
        comment_repo,
        post_repo,
        user_repo,
        notification_service.clone(),
    );
    comment_service.set_event_publisher(event_publisher);

    // Bridge Redis events into the WebSocket broadcast
    let streaming = StreamingState::new();
    {
        let streaming = streaming.clone();
        PubSubStreamBridge::new(&pubsub).start(move |message| streaming.publish(message));
    }

    // Create app state
    let state = AppState {
        user_service,
        post_service,
        like_service,
        comment_service,
        notification_service,
        streaming,
    };

    // Build router
    let app = Router::new()
        .route("/streaming", get(streaming_handler))
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ripple_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Release the relay connections before exiting
    if let Err(e) = pubsub.shutdown().await {
        tracing::warn!(error = %e, "Pub/Sub shutdown failed");
    }

    info!("Server shutdown complete");
    Ok(())
}
