pub mod gateway;
pub mod handler;
pub mod registry;

pub use gateway::{ConnectionGateway, LiveConnection};
pub use handler::ws_handler;
pub use registry::ConnectionRegistry;
