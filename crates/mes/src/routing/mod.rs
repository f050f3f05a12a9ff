pub mod model;
pub mod order;
pub mod repo;

pub use model::{
    BatchUpdate, NameEntry, NewOperation, Operation, OperationPatch, OperationStatus, OrderEntry,
    Page, SearchQuery, SearchType,
};
pub use repo::OperationsRepo;
