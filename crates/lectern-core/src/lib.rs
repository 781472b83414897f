//! Lectern Core — domain models, repository trait definitions, and the
//! pure access-decision logic shared across all crates.
//!
//! This crate provides:
//! - The error taxonomy ([`error::LecternError`])
//! - Caller identity snapshots ([`identity::Identity`])
//! - Domain models for groups, memberships, grants, lectures and files
//! - Repository trait definitions ([`repository`])
//! - The access resolver and authorization gate ([`resolver`], [`gate`])
//!
//! It performs no I/O; persistence lives in `lectern-db`.

pub mod error;
pub mod gate;
pub mod identity;
pub mod models;
pub mod repository;
pub mod resolver;
