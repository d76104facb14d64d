//! Booking cart engine for a hotel storefront: availability checks, date
//! pickers, booking code lookup, a server-synchronized cart, and checkout
//! split across new and existing invoices.

pub mod api;
pub mod cart;
pub mod checkout;
pub mod client;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod validator;
pub mod wire;
