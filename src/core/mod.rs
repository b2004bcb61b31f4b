//! Engine components: loading, scoring, selection and history updates.

pub mod catalog;
pub mod config;
pub mod encounter;
pub mod engine;
pub mod fragment;
pub mod history_store;
pub mod scorer;
pub mod selector;
pub mod updater;
