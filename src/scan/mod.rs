pub mod routes;
pub mod scan_handlers;
pub mod scan_models;
pub mod scan_service;

pub use scan_service::ScanResolver;
