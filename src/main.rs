//! Verification agent server.
//!
//! Wires configuration, adapters and handlers, then serves the webhook and
//! contact endpoints.

use std::error::Error;
use std::sync::Arc;

use secrecy::ExposeSecret;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use verification_agent::adapters::http::{api_router, ContactHandlers, WebhookHandlers};
use verification_agent::adapters::{
    HttpMediaFetcher, HttpVerificationService, InMemoryJourneyStore, MediaCredentials,
    OpenAIConfig, OpenAIProvider, RecordingSender, RedisJourneyStore, TwilioConfig, TwilioSender,
    VerificationApiConfig,
};
use verification_agent::application::{
    ClientLocks, FunctionDispatcher, HandleMessageHandler, IdentityProfile, InstructionWriter,
    RegisterContactHandler, RemoveContactHandler, ToolCallPipeline, ToolPipelineConfig,
};
use verification_agent::config::{AppConfig, ConfigError, MessagingConfig, ValidationError};
use verification_agent::domain::tools::ToolCatalog;
use verification_agent::ports::{
    AIProvider, ClientFunctions, JourneyStore, MediaFetcher, MessageSender, VerificationService,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    config.validate().map_err(ConfigError::from)?;

    init_tracing(&config);

    let ai_provider = build_ai_provider(&config)?;
    let store = build_store(&config).await?;
    let sender = build_sender(&config.messaging)?;
    let fetcher = build_fetcher(&config)?;
    let verification = build_verification(&config)?;

    let profile = IdentityProfile::new(verification, fetcher)
        .with_config(config.conversation.profile_config());
    let catalog = Arc::new(ToolCatalog::from_specifications(profile.tool_specifications())?);
    let dispatcher = Arc::new(FunctionDispatcher::from_functions(&profile));
    let pipeline = Arc::new(
        ToolCallPipeline::new(ai_provider.clone(), dispatcher.clone(), catalog).with_config(
            ToolPipelineConfig {
                temperature: config.ai.temperature,
                max_tokens: config.ai.max_tokens,
            },
        ),
    );
    let writer = Arc::new(InstructionWriter::new(
        ai_provider,
        config.conversation.instruction_config(),
    ));

    let messages = config.conversation.messages();
    let locks = ClientLocks::new();

    let message_handler = HandleMessageHandler::new(
        store.clone(),
        sender.clone(),
        pipeline,
        dispatcher,
        writer,
    )
    .with_messages(messages.clone())
    .with_locks(locks.clone())
    .with_turn_timeout(config.conversation.turn_timeout());
    let register_handler =
        RegisterContactHandler::new(store.clone(), sender, config.conversation.institution.clone())
            .with_messages(messages)
            .with_locks(locks.clone());
    let remove_handler = RemoveContactHandler::new(store).with_locks(locks);

    let app = api_router(
        WebhookHandlers::new(Arc::new(message_handler)),
        ContactHandlers::new(Arc::new(register_handler), Arc::new(remove_handler)),
    )
    .layer(TimeoutLayer::new(config.server.request_timeout()))
    .layer(TraceLayer::new_for_http())
    .layer(PropagateRequestIdLayer::x_request_id())
    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Verification agent listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_ai_provider(config: &AppConfig) -> Result<Arc<dyn AIProvider>, Box<dyn Error>> {
    let api_key = config
        .ai
        .api_key
        .as_ref()
        .ok_or(ValidationError::MissingRequired("AI__API_KEY"))?;

    let provider = OpenAIProvider::new(
        OpenAIConfig::new(api_key.expose_secret().clone())
            .with_model(config.ai.model.clone())
            .with_base_url(config.ai.base_url.clone())
            .with_timeout(config.ai.timeout())
            .with_max_retries(config.ai.max_retries),
    )?;
    Ok(Arc::new(provider))
}

async fn build_store(config: &AppConfig) -> Result<Arc<dyn JourneyStore>, Box<dyn Error>> {
    match config.redis.url() {
        Some(url) => {
            let store = RedisJourneyStore::connect(url)
                .await?
                .with_key_prefix(config.redis.key_prefix.clone());
            tracing::info!("Using Redis journey store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No Redis URL configured; journeys are kept in memory");
            Ok(Arc::new(InMemoryJourneyStore::new()))
        }
    }
}

fn build_sender(config: &MessagingConfig) -> Result<Arc<dyn MessageSender>, Box<dyn Error>> {
    let (Some(sid), Some(token), Some(from)) =
        (&config.account_sid, &config.auth_token, &config.from_number)
    else {
        tracing::warn!("No messaging account configured; outbound messages are only logged");
        return Ok(Arc::new(RecordingSender::new()));
    };

    let mut twilio = TwilioConfig::new(sid.clone(), token.expose_secret().clone(), from.clone());
    if let Some(base) = &config.api_base_url {
        twilio = twilio.with_api_base(base.clone());
    }
    Ok(Arc::new(TwilioSender::new(twilio)?))
}

fn build_fetcher(config: &AppConfig) -> Result<Arc<dyn MediaFetcher>, Box<dyn Error>> {
    let mut fetcher = HttpMediaFetcher::new(config.verification.timeout())?;
    if let (Some(sid), Some(token)) = (&config.messaging.account_sid, &config.messaging.auth_token) {
        fetcher = fetcher.with_credentials(MediaCredentials::new(
            sid.clone(),
            token.expose_secret().clone(),
        ));
    }
    Ok(Arc::new(fetcher))
}

fn build_verification(config: &AppConfig) -> Result<Arc<dyn VerificationService>, Box<dyn Error>> {
    let settings = &config.verification;
    let (Some(key), Some(secret)) = (&settings.api_key, &settings.api_secret) else {
        return Err(ValidationError::MissingRequired("VERIFICATION__API_KEY").into());
    };

    let service = HttpVerificationService::new(
        VerificationApiConfig::new(
            settings.base_url.clone(),
            key.expose_secret().clone(),
            secret.expose_secret().clone(),
        )
        .with_timeout(settings.timeout()),
    )?;
    Ok(Arc::new(service))
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    tracing::info!("Received shutdown signal");
}
