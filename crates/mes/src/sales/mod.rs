pub mod model;
pub mod repo;

pub use model::{
    NewSalesInbound, NewSalesItem, RouteStep, SalesEligibleItem, SalesInbound, SalesItem,
    SalesItemUpdate, WorkOrder,
};
pub use repo::SalesRepo;
