//! ICS feed parsing.
//!
//! This module turns an RFC 5545 document into [`EventDefinition`](crate::event::EventDefinition)s.

mod parse;

pub use parse::{ParsedFeed, parse_feed};
