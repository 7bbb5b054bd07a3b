//! Translation engines: one single-item and one batch translator per provider

pub mod google;
pub mod microsoft;

pub use google::GoogleEngine;
pub use microsoft::MicrosoftEngine;
