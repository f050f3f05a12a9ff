pub mod lot;
pub mod model;
pub mod repo;

pub use model::{EligibleItem, Inbound, NewInbound, NewOutbound, Outbound, StockRow};
pub use repo::InventoryRepo;
