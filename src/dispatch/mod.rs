pub mod dispatcher;

pub use dispatcher::{DispatchConfig, Dispatcher};
