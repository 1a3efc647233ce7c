//! REST API client module for the upstream messaging service.
//!
//! This module provides `PaginatedFetcher`, which follows `nextUrl` cursors
//! across pages, and the `InboxClient` / `MessageThreadClient` built on it.
//!
//! Requests authenticate with the cookie jar captured at login. Nothing
//! fetched here is cached.

pub mod client;
pub mod error;
pub mod pagination;

pub use client::{parse_peer_list, InboxClient, InboxResult, MessageThreadClient, PeerThreads, ThreadResult};
pub use error::ApiError;
pub use pagination::{FetchResult, FetchedPage, PaginatedFetcher};
