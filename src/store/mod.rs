pub mod interface;
pub mod memory;
pub mod mongo;
pub mod factory;

pub use interface::{DiseaseStore, StoreError};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use factory::StoreFactory;
