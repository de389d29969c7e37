pub mod disease;
pub mod fields;

pub use disease::{DiseaseRecord, DiseaseSummary};
