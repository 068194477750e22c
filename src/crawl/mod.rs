// src/crawl/mod.rs
// =============================================================================
// This module discovers the pages of a site.
//
// Features:
// - Fetches a single seed page and collects its anchor links
// - Keeps only same-site links (subdomains included) that look like pages
// - Writes the resulting frontier to `<hostname>.txt`
//
// The frontier feeds the mirror module, one page per line.
//
// Rust concepts:
// - pub use: re-exports so callers write crawl::build_frontier
// =============================================================================

mod frontier;

pub use frontier::{build_frontier, frontier_file_name, write_frontier};
