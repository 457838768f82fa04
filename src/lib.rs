pub mod analysis;
pub mod artifacts;
pub mod audit;
pub mod clock;
pub mod config;
pub mod db;
pub mod deadline;
pub mod directory;
pub mod error;
pub mod llm;
pub mod machine;
pub mod models;
pub mod patd;
pub mod policy;
pub mod s3;
pub mod sanction;
pub mod scheduler;
pub mod schema;
pub mod state;
pub mod storage;
pub mod store;
pub mod workflow;

pub use error::{PatdError, PatdResult};
pub use scheduler::{default_tasks, Scheduler};
pub use state::AppState;
