//! Shared helpers: dates, HTML text processing, slugs.

pub mod date;
pub mod html;
pub mod slug;
