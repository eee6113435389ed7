//! warden-cli
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Library half of the `warden` binary: loading an enforcer from files and
//! the `enforce`, `roles`, `model` and `schema` commands.

pub mod commands;
