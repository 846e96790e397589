/// Background jobs
pub mod ingress;

pub use ingress::IngressQueue;
