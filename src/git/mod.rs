pub mod models;
pub mod query;

pub use models::*;
pub use query::{GitCli, VcsQuery};
