pub mod action;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod evaluation;
pub mod expr;
pub mod group;
pub mod handler;
pub mod io;
pub mod model;
pub mod paths;
pub mod registry;
pub mod resolver;
pub mod response;
pub mod types;

pub use error::{ActionError, Result};
