//! Shared helpers for the gateway integration suites.

#![allow(dead_code)]

pub mod app;
