pub mod config;
pub mod error;
pub mod db;
pub mod model;
pub mod store;
pub mod ingest;
pub mod api;

pub use config::Config;
pub use error::{PocdeskError, Result};
pub use model::{CandidatePoc, CandidateRecord, Company, Poc, PocStatus, Role, User};
