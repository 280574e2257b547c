//! Sales Funnel Tracking API Library
//!
//! Core functionality for the sales funnel tracking API: lead capture with
//! mobile-number deduplication, the append-only interaction history with its
//! denormalized lead snapshot, lead-to-sale conversion, influencer source
//! code lifecycle, and the dashboard aggregates built on top.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `dashboard`: Dashboard aggregation (pure folds plus the windowed store).
//! - `db`: Database connection, pool management and migrations.
//! - `errors`: Error handling types.
//! - `filters`: Query-parameter filter builder and pagination.
//! - `handlers`: HTTP request handlers.
//! - `influencers`: Influencer and source code storage.
//! - `interactions`: Interaction history storage and snapshot propagation.
//! - `leads`: Lead storage.
//! - `models`: Core data models.
//! - `sales`: Sale storage and the conversion flow.
//! - `users`: User account storage.

pub mod config;
pub mod dashboard;
pub mod db;
pub mod errors;
pub mod filters;
pub mod handlers;
pub mod influencers;
pub mod interactions;
pub mod leads;
pub mod models;
pub mod sales;
pub mod users;
