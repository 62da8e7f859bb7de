//! core
//!
//! Core domain types, storage layout, and configuration for Chronicle.
//!
//! # Modules
//!
//! - [`types`] - Strong types: ClassId, ObjectId, Revision, etc.
//! - [`snapshot`] - The stored form of one object's state
//! - [`paths`] - Centralized mapping of classes and objects to storage
//! - [`ops`] - Commit locking
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid identifiers from reaching storage
//! - Serialization is deterministic, so equal states give equal blobs
//! - Path derivation is pure and depends only on class and id

pub mod config;
pub mod ops;
pub mod paths;
pub mod snapshot;
pub mod types;
