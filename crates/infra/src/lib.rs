//! Infrastructure layer: repositories, configuration, locking and the services that
//! tie warehouses, lots, deliveries and vendor orders together.
//!
//! Storage is in-memory behind repository traits; the services are generic over them.

pub mod alerts;
pub mod config;
pub mod error;
pub mod locks;
pub mod repository;
pub mod services;


pub use alerts::{AlertSink, Alerting, BusAlertSink, NoopAlertSink, TracingAlertSink};
pub use config::{FarmlinkConfig, LoggingConfig};
pub use error::{RepoResult, RepositoryError, ServiceError, ServiceResult};
pub use locks::LocationLocks;
pub use repository::{InMemoryStores, Stores};
