pub mod config;
pub mod corpus;
pub mod errors;
pub mod inference;
pub mod init;
pub mod instance;
pub mod model;
pub mod multinomial;
pub mod parallel;
pub mod train;

pub use crate::instance::Instance;
pub use crate::model::{Model, Statistics};
pub use crate::parallel::ParallelTrainer;
