pub mod container_service;

pub use container_service::*;
