//! Plain data types shared by the catalog, history and selection layers.

pub mod history;
pub mod motif;
pub mod request;
