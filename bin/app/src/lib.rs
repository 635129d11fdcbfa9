//! KCLoft browser front end.
//!
//! Signs users in against the organization's identity provider, guards the
//! question bank behind that sign-in, and calls the questions API with the
//! user's access token. Built for the browser with `--features csr`.

#![allow(non_snake_case)]

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod navigation;
pub mod pages;

#[cfg(feature = "csr")]
pub mod browser;
