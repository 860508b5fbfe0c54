//! Notification adapters: in-memory stores, the `PostgreSQL` stores and the
//! broadcast fanout hub.

pub mod broadcast;
pub mod memory;
pub mod postgres;
