//! Text-to-diagram import: parse a small diagram DSL, lay it out, and write the
//! result into a diagram store as one undoable command.

pub mod command;
pub mod config;
pub mod dsl;
pub mod error;
pub mod layout;
pub mod projection;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
