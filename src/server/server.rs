use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::server::*;
use crate::settings::Settings;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, Pool};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct StoreParts {
    tx_manager: Arc<dyn TxManager>,
    friendship_repo: Arc<dyn FriendshipRepo>,
    user_repo: Arc<dyn UserRepo>,
    pool: Option<Pool<MySql>>,
}

async fn open_store(settings: &Settings) -> anyhow::Result<StoreParts> {
    match settings.store.backend.as_str() {
        "memory" => {
            let store = MemoryStore::new();
            let user_repo = MemoryUserRepo::with_users(
                settings.store.seed_users.iter().map(String::as_str),
            )?;
            Ok(StoreParts {
                tx_manager: Arc::new(MemoryTxManager::new(store.clone())),
                friendship_repo: Arc::new(MemoryFriendshipRepo::new(store)),
                user_repo: Arc::new(user_repo),
                pool: None,
            })
        }
        "mysql" => {
            let dsn = settings
                .store
                .dsn
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("store.dsn is required for the mysql backend"))?;
            let pool = MySqlPoolOptions::new()
                .max_connections(settings.store.max_connections)
                .connect(dsn)
                .await?;
            if settings.store.run_migrations {
                sqlx::migrate!("./migrations").run(&pool).await?;
                info!("migrations applied");
            }
            Ok(StoreParts {
                tx_manager: Arc::new(MySqlTxManager::new(
                    pool.clone(),
                    settings.store.lock_wait_timeout_secs,
                )),
                friendship_repo: Arc::new(MySqlFriendshipRepo::new(pool.clone())),
                user_repo: Arc::new(MySqlUserRepo::new(pool.clone())),
                pool: Some(pool),
            })
        }
        other => Err(anyhow::anyhow!("Unknown store backend: {}", other)),
    }
}

pub struct Server {
    pub user_service: Arc<dyn UserService>,
    pub friendship_service: Arc<dyn FriendshipService>,
    mailer_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let StoreParts {
            tx_manager,
            friendship_repo,
            user_repo,
            pool,
        } = open_store(settings).await?;

        let transport: Arc<dyn MailTransport> = match settings.mail.backend.as_str() {
            "log" => Arc::new(LogMailTransport),
            other => return Err(anyhow::anyhow!("Unknown mail backend: {}", other)),
        };

        let cancel = CancellationToken::new();
        let (mail_queue, queue) = MailQueueHook::new(settings.mail.queue_capacity);
        let mailer = Mailer::new(
            queue,
            user_repo.clone(),
            transport,
            &settings.mail.sender,
            cancel.clone(),
        );

        let user_service: Arc<dyn UserService> = Arc::new(RealUserService::new(user_repo));
        let friendship_service: Arc<dyn FriendshipService> = Arc::new(RealFriendshipService::new(
            user_service.clone(),
            friendship_repo,
            Arc::new(mail_queue),
            tx_manager,
        ));

        let mailer_handle = tokio::spawn(async move {
            if let Err(e) = mailer.run().await {
                error!("Mailer error: {:#}", e);
            }
        });

        info!(store = %settings.store.backend, "server started");

        Ok(Self {
            user_service,
            friendship_service,
            mailer_handle: Mutex::new(Some(mailer_handle)),
            cancel,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = self.mailer_handle.lock().ok().and_then(|mut lock| lock.take());
        if let Some(handle) = handle {
            let r = handle.await;
            info!("mailer handle dropped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
