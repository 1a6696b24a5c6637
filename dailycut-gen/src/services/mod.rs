//! Generation services

pub mod albums;
pub mod cache;
pub mod context;
pub mod gate;
pub mod pipeline;
pub mod vinyl;
