/// Shared application state
use crate::{
    config::ServerConfig,
    jobs::IngressQueue,
    services::{
        AuthService, Catalog, Directory, EventIngress, QueueStore, RefillOrchestrator,
        StartupReconciler,
    },
};
use refrain_core::{EventProducer, Topics};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub directory: Arc<Directory>,
    pub queue: Arc<QueueStore>,
    pub refill: Arc<RefillOrchestrator>,
    pub ingress: Arc<EventIngress>,
    pub ingress_queue: Arc<IngressQueue>,
    pub auth_service: Arc<AuthService>,
    pub topics: Arc<Topics>,
    pub default_username: String,
}

impl AppState {
    /// Wire every service over one pool and one producer
    ///
    /// Ingress workers are not started here; call
    /// `state.ingress_queue.start()` from inside the runtime.
    pub fn new(pool: SqlitePool, producer: Arc<dyn EventProducer>, config: &ServerConfig) -> Self {
        let catalog = Arc::new(Catalog::new(pool.clone()));
        let directory = Arc::new(Directory::new(pool.clone(), Arc::clone(&producer)));
        let queue = Arc::new(QueueStore::new(pool));

        let refill = Arc::new(RefillOrchestrator::new(
            Arc::clone(&catalog),
            Arc::clone(&directory),
            Arc::clone(&queue),
            producer,
            config.refill.clone(),
        ));

        let ingress = Arc::new(EventIngress::new(
            Arc::clone(&catalog),
            Arc::clone(&directory),
            Arc::clone(&queue),
            Arc::clone(&refill),
            &config.refill,
        ));

        let ingress_queue = Arc::new(IngressQueue::new(
            Arc::clone(&ingress),
            config.ingress.workers,
            config.ingress.queue_capacity,
        ));

        let auth_service = Arc::new(AuthService::new(
            config.auth.jwt_secret.clone(),
            config.auth.jwt_expiration_hours,
        ));

        Self {
            catalog,
            directory,
            queue,
            refill,
            ingress,
            ingress_queue,
            auth_service,
            topics: Arc::new(config.messaging.topics.clone()),
            default_username: config.bootstrap.default_username.clone(),
        }
    }

    pub fn reconciler(&self) -> StartupReconciler {
        StartupReconciler::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.directory),
            Arc::clone(&self.queue),
            self.default_username.clone(),
        )
    }
}
