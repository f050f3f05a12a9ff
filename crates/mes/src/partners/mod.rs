pub mod model;
pub mod repo;

pub use model::{ActiveFlag, NewPartner, Partner, PartnerType, PartnerUpdate};
pub use repo::PartnersRepo;
