//! HTTP request handlers

pub mod extract;
pub mod health;
pub mod schemas;
