//! Vendor-specific integrations.

pub mod openai;
