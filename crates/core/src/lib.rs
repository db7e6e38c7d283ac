//! gifscope-core — client-side model for browsing GIFs through the gifscope proxy.
//!
//! Everything here is UI-agnostic: the CLI renders [`presenter::GridView`] as text,
//! but the same session model would drive any front end.
//!
//! # Modules
//!
//! - [`types`] — Ratings, query keys, media items, and the paged response shape
//! - [`error`] — Crate error type
//! - [`query`] — Paged query controller, page sources, and the fetch runner
//! - [`debounce`] — Trailing-edge debouncer for search text
//! - [`controls`] — Search box, rating filter, and mode switch
//! - [`client`] — HTTP client for the proxy endpoints and media URLs
//! - [`presenter`] — Grid view: placeholders, empty state, tiles, activation
//! - [`clipboard`] — Copy-to-clipboard fallback chain
//! - [`download`] — Save a tile's original rendition to disk
//! - [`notify`] — Transient notifications
//! - [`session`] — Event loop tying it all together
//! - [`config`] — Client configuration file

pub mod client;
pub mod clipboard;
pub mod config;
pub mod controls;
pub mod debounce;
pub mod download;
pub mod error;
pub mod notify;
pub mod presenter;
pub mod query;
pub mod session;
pub mod types;

pub use error::{Error, Result};
