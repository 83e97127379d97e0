//! Document preview: Markdown rendering, styled-text handling, search and
//! the scrollable viewport.

pub mod ansi;
pub mod markdown;
pub mod search;
pub mod viewport;
