pub mod backend;
pub mod editor;
pub mod error;
pub mod loader;

pub use backend::{HttpRoutingBackend, RoutingBackend};
pub use editor::OperationList;
pub use error::{ClientError, ClientResult};
pub use loader::{LoadState, ResourceLoader};
