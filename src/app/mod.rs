pub mod repair;
pub mod runtime;
pub mod service;
pub mod service_lifecycle;
pub mod service_query;
pub mod service_types;
pub mod service_utils;
pub mod state;
pub mod stdin;
pub mod storage;

pub use service::TasqueService;
pub use service_types::*;
