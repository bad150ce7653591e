//! Application state wiring all services together.
//!
//! Services are generic over repository and selector traits; `AppState`
//! pins them to the SQLite repositories and the provider registry from
//! grandma-infra. Both the CLI and the HTTP handlers work through it.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use grandma_core::chat::service::ChatService;
use grandma_core::service::conversation::ConversationService;
use grandma_core::service::document::DocumentService;
use grandma_core::service::story::StoryService;
use grandma_infra::config::{database_path, load_app_config, resolve_data_dir};
use grandma_infra::crypto::hash::Sha256ContentHasher;
use grandma_infra::llm::{ProviderCredentials, ProviderRegistry};
use grandma_infra::sqlite::conversation::SqliteConversationRepository;
use grandma_infra::sqlite::document::SqliteDocumentRepository;
use grandma_infra::sqlite::pool::{DatabasePool, database_url};
use grandma_infra::sqlite::story::SqliteStoryRepository;
use grandma_types::config::AppConfig;

pub type ConcreteChatService =
    ChatService<SqliteConversationRepository, SqliteDocumentRepository, Arc<ProviderRegistry>>;

pub type ConcreteConversationService = ConversationService<
    SqliteConversationRepository,
    SqliteDocumentRepository,
    Arc<ProviderRegistry>,
>;

pub type ConcreteDocumentService = DocumentService<SqliteDocumentRepository>;

pub type ConcreteStoryService = StoryService<SqliteStoryRepository, Sha256ContentHasher>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub conversation_service: Arc<ConcreteConversationService>,
    pub document_service: Arc<ConcreteDocumentService>,
    pub story_service: Arc<ConcreteStoryService>,
    pub providers: Arc<ProviderRegistry>,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
    /// Cancelled on server shutdown; every chat stream holds a child token.
    pub shutdown: CancellationToken,
    /// Detached chat stream tasks; drained before the pool closes.
    pub streams: TaskTracker,
}

impl AppState {
    /// Resolve the data directory, load configuration, open the database.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;
        let config = load_app_config(&data_dir).await;
        Self::build(config, data_dir, ProviderCredentials::from_env()).await
    }

    /// Wire services from an already-loaded configuration.
    pub async fn build(
        config: AppConfig,
        data_dir: PathBuf,
        credentials: ProviderCredentials,
    ) -> anyhow::Result<Self> {
        let db_path = database_path(&config, &data_dir);
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let db_pool = DatabasePool::new(&database_url(&db_path)).await?;
        tracing::debug!(path = %db_path.display(), "database opened");

        let providers = Arc::new(ProviderRegistry::new(
            credentials,
            config.openai.clone(),
            config.anthropic.clone(),
        )?);

        let chat_service = ChatService::new(
            SqliteConversationRepository::new(db_pool.clone()),
            SqliteDocumentRepository::new(db_pool.clone()),
            Arc::clone(&providers),
            config.chat.clone(),
        );
        let conversation_service = ConversationService::new(
            SqliteConversationRepository::new(db_pool.clone()),
            SqliteDocumentRepository::new(db_pool.clone()),
            Arc::clone(&providers),
            config.chat.title_model.clone(),
        );
        let document_service = DocumentService::new(SqliteDocumentRepository::new(db_pool.clone()));
        let story_service = StoryService::new(
            SqliteStoryRepository::new(db_pool.clone()),
            Sha256ContentHasher::new(),
        );

        Ok(Self {
            chat_service: Arc::new(chat_service),
            conversation_service: Arc::new(conversation_service),
            document_service: Arc::new(document_service),
            story_service: Arc::new(story_service),
            providers,
            config: Arc::new(config),
            data_dir,
            db_pool,
            shutdown: CancellationToken::new(),
            streams: TaskTracker::new(),
        })
    }

    /// Cancel in-flight chat streams and wait for each to flush and link
    /// its assistant document.
    pub async fn drain_streams(&self) {
        self.shutdown.cancel();
        self.streams.close();
        if !self.streams.is_empty() {
            tracing::info!(pending = self.streams.len(), "waiting for in-flight chat streams");
        }
        self.streams.wait().await;
    }
}
