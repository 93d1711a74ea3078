pub mod factory;
pub mod iters;

pub use crate::domain::model::{Keyed, Record};
pub use crate::domain::ports::{Dao, RecordIter};
pub use crate::utils::error::Result;
