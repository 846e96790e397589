/// Server services
pub mod auth;
pub mod catalog;
pub mod directory;
pub mod ingress;
pub mod locks;
pub mod queue;
pub mod reconciler;
pub mod refill;

pub use auth::AuthService;
pub use catalog::Catalog;
pub use directory::{Directory, UserCreation};
pub use ingress::EventIngress;
pub use locks::UserLocks;
pub use queue::QueueStore;
pub use reconciler::{ReconcileReport, StartupReconciler};
pub use refill::{Consumption, RefillOrchestrator, RefillPolicy, ScheduledRefill};
