//! dispatch tracker
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use dispatch_tracker::chain_client::SubxtChainClient;
use dispatch_tracker::error_decoder::ErrorDecoder;
use dispatch_tracker::signer::{self, TransactionSigner};
use dispatch_tracker::state::AppState;
use dispatch_tracker::tx_submitter::SubmissionPipeline;
use dispatch_tracker::tx_tracker::{ConfirmationTracker, TrackerConfig};
use dispatch_tracker::{api, model};
use log::{info, warn};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Dispatch Tracker CLI
#[derive(Parser, Debug)]
#[command(
    name = "dispatch-tracker",
    about = "Submit asset and liquidity operations and track them to confirmation"
)]
struct Cli {
    /// URL of the Substrate node (e.g. ws://127.0.0.1:9944)
    #[arg(
        long,
        env = "NODE_URL",
        default_value = "ws://127.0.0.1:9944",
        help = "URL of the Substrate node"
    )]
    node_url: String,

    /// Path to the key file used for signing transactions
    #[arg(
        long,
        env = "SIGNER_KEY",
        help = "Path to a hex encoded sr25519 secret; without it every submission is refused"
    )]
    signer_key: Option<String>,

    /// Address and port to bind the HTTP server (default: 127.0.0.1:3000)
    #[arg(
        long,
        env = "BIND_ADDR",
        default_value = "127.0.0.1:3000",
        help = "Address to bind the Axum HTTP server"
    )]
    bind_addr: String,

    /// Confirmation polling policy
    #[command(flatten)]
    tracker: TrackerConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger with fallback to info if RUST_LOG is not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    info!("🚀 Starting Dispatch Tracker...");

    let client = SubxtChainClient::connect(&cli.node_url).await?;

    let signer: Option<Arc<dyn TransactionSigner>> = match &cli.signer_key {
        Some(path) => {
            let keypair = signer::load_substrate_key(path).await?;
            info!("🔑 Signing as {}", TransactionSigner::address(&keypair));
            Some(Arc::new(keypair))
        }
        None => {
            warn!("⚠️ No signer key configured, submissions will be refused");
            None
        }
    };

    info!(
        "⏱️ Tracking policy: {} attempts every {}ms, {:?} target",
        cli.tracker.attempt_limit, cli.tracker.delay_ms, cli.tracker.poll_target
    );
    let decoder = ErrorDecoder::new(Arc::new(client.api().clone()));
    let chain = Arc::new(client.clone());
    let tracker = ConfirmationTracker::new(chain.clone(), decoder, cli.tracker);
    let shutdown = CancellationToken::new();

    let state = Arc::new(AppState {
        pipeline: SubmissionPipeline::new(chain, tracker.clone()),
        tracker,
        signer,
        shutdown: shutdown.clone(),
    });

    // ──────────────── ROUTING ────────────────
    info!("🔧 Setting up routing...");
    let swagger = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    let app = Router::new()
        .route("/transfer_asset", post(api::operations::transfer_asset))
        .route("/mint_asset", post(api::operations::mint_asset))
        .route("/create_asset", post(api::operations::create_asset))
        .route(
            "/deposit_liquidity",
            post(api::operations::deposit_liquidity),
        )
        .route(
            "/withdraw_liquidity",
            post(api::operations::withdraw_liquidity),
        )
        .route(
            "/get_extrinsic_status_in_block",
            get(api::extrinsics::get_extrinsic_status_in_block),
        )
        .route("/track_extrinsic", get(api::extrinsics::track_extrinsic))
        .with_state(state.clone())
        .merge(swagger)
        .layer(CorsLayer::new().allow_origin(Any));

    info!("🟢 Routes set up successfully.");
    info!("🔵 Binding to {}", cli.bind_addr);

    let listener = TcpListener::bind(&cli.bind_addr).await?;
    info!("🚀 Server running on http://{}", cli.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("⚠️ Failed to listen for Ctrl-C: {err}");
            }
            info!("🛑 Shutting down, abandoning in-flight tracking");
            shutdown.cancel();
        })
        .await?;

    drop(state);
    client.close();
    Ok(())
}

/// OpenAPI document served at `/api-docs/openapi.json`
#[derive(OpenApi)]
#[openapi(
    paths(
        api::operations::transfer_asset,
        api::operations::mint_asset,
        api::operations::create_asset,
        api::operations::deposit_liquidity,
        api::operations::withdraw_liquidity,
        api::extrinsics::get_extrinsic_status_in_block,
        api::extrinsics::track_extrinsic,
    ),
    components(schemas(model::StatusReport, model::SubmissionStatus, model::ApiResponse))
)]
struct ApiDoc;
