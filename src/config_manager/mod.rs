pub mod main;
pub mod store;
pub mod system;
pub mod utils;

pub use main::Config;
pub use store::{MongoConfig, ReconnectionPolicy, StoreConfig, StoreKind};
pub use system::SystemConfig;
