pub mod model;
pub mod repo;

pub use model::{NewRawItem, RawItem, RawItemUpdate};
pub use repo::RawItemsRepo;
