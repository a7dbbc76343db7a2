//! Postpay - Subscription Billing Backend
//!
//! This crate integrates an email-campaign platform with its payment gateway:
//! it verifies inbound payment notifications and reconciles them into
//! idempotent transaction-state transitions and plan entitlements.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
