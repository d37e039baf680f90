//! Shared data types: controller settings and the cluster wire models.

pub mod config;
pub mod topology;
