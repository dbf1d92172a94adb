//! Integration tests: in-memory store, HTTP router and (ignored) live Postgres

mod api_tests;
mod booking_tests;
mod common;
mod postgres_tests;
