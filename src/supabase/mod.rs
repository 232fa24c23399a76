//! Hand-rolled client for the Supabase-style data platform.
//!
//! Split by platform surface: `auth` (GoTrue), `postgrest` (table store),
//! `storage` (object storage). All responses funnel through the adapter in
//! `response` so the rest of the crate only ever sees `PlatformError`.

pub mod auth;
pub mod client;
pub mod postgrest;
pub mod response;
pub mod storage;

pub use client::SupabaseClient;
