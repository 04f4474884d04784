//! File Drop - browser-facing upload gateway for Cloudflare R2 and other
//! S3-compatible stores
//!
//! This library provides the core functionality for the File Drop server:
//! multipart uploads driven by independent HTTP calls, and single-shot
//! uploads for small files.

pub mod api;
pub mod config;
pub mod storage;
pub mod types;
pub mod upload;
