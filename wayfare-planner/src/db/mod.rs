//! Database access for wayfare-planner
//!
//! Free functions over `&SqlitePool`; the schema itself is created by
//! `wayfare_common::db::init`.

pub mod groups;
pub mod members;
pub mod settings;
