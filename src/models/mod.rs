pub mod card;
pub mod license;
