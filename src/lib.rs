//! CRM Payments - recurring payment charging
//!
//! Selects due recurrent payments, prices each billing cycle (including the
//! VAT-proportional split of custom amounts), charges stored tokens through
//! gateway clients and drives the retry and stop state machine.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
