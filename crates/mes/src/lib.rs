pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod inventory;
pub mod items;
pub mod logging;
pub mod partners;
pub mod routing;
pub mod sales;
