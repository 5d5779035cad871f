//! Database module: entity models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: typed rows and filter structs returned by repositories.
//! - `repo`: SQL-only functions that map rows into entities.
//!
//! External modules should import from `consulta_fgts::db`; the repository
//! API and commonly used models are re-exported for convenience.

pub mod model;
pub mod repo;

// Re-export the repository API at `crate::db::*`.
pub use repo::*;

pub use model::{Campanha, ConsultaRow, PropostaRow};
