use kgviz_auth::UserService;
use kgviz_config::AppConfig;
use kgviz_database::Database;
use kgviz_graph::{ChatService, GraphService, ImportService};

/// Services shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub graph: GraphService,
    pub import: ImportService,
    pub chat: ChatService,
    pub users: UserService,
    /// Mounts `/api/users` when set.
    pub user_management: bool,
}

impl AppState {
    pub fn new(db: Database, config: &AppConfig) -> Self {
        let toggles = &config.feature_toggles;
        let chat = ChatService::from_config(&config.chat, toggles.external_chat_enabled());
        tracing::info!(external_chat = chat.external_available(), "Chat service ready");

        Self {
            graph: GraphService::new(db.clone()),
            import: ImportService::new(db.clone()),
            users: UserService::new(db.clone(), config.auth.bcrypt_cost),
            user_management: toggles.user_management_enabled(),
            chat,
            db,
        }
    }
}
