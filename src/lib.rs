//! Sweet shop: a catalog of confectionery that signed-in users can browse and
//! buy from, and that administrators maintain.
//!
//! The crate holds both halves. The backend (`routes` over a [`store::Store`])
//! serves accounts, the catalog and purchases. The storefront
//! ([`storefront::Storefront`]) drives a [`backend::Backend`] with its session,
//! catalog view and item flows.

pub mod auth;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod form;
pub mod http;
pub mod inventory;
pub mod memory;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod session;
pub mod store;
pub mod storefront;
