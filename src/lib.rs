//! Native client for a customer-support chat backend.
//!
//! The [`surfaces`] controllers hold all client behaviour and render through view
//! traits. With the `gtk` feature, [`ui`] supplies libadwaita windows for them.

pub mod api;
pub mod app;
pub mod notify;
pub mod push;
pub mod storage;
pub mod surfaces;
pub mod utils;

#[cfg(feature = "gtk")]
pub mod ui;
