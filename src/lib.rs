//! Shipping tax fix engine for e-commerce orders
//!
//! This crate recomputes the VAT split of tax-inclusive shipping charges under
//! a target rate (15% or 25%), moves the shipping tax to the matching
//! configured tax rate, and rebuilds the order's tax summary while leaving the
//! grand total unchanged. It also annotates orders with the rate their
//! shipping is effectively taxed at, for listings and reports.

#![warn(missing_docs)]

pub mod api;
pub mod batch;
pub mod calculation;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
