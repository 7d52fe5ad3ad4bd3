pub mod accounts;
pub mod orders;
pub mod tracking;
