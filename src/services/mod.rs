//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business rules and every call to the backend so route
//! handlers can stay focused on protocol translation and session plumbing.

pub mod auth;
pub mod booking;
pub mod bootstrap;
pub mod contact;
pub mod dashboard;
pub mod listing;
pub mod moderation;
pub mod offering;
pub mod session;
