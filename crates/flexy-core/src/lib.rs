//! Domain logic for the Flexy caregiver shift calendar.
//!
//! Everything here is browser-free: the web and terminal clients build
//! their grids, overlays, forms and roster checks from these types and
//! talk to the backend through [`api::ShiftApi`].

pub mod api;
pub mod config;
pub mod datetime;
pub mod editor;
pub mod grid;
pub mod overlay;
pub mod roster;
pub mod shift;
pub mod template;
pub mod view;
