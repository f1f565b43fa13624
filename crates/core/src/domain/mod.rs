pub mod analysis;
pub mod article;
pub mod reference;
