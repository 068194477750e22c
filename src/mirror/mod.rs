// src/mirror/mod.rs
// =============================================================================
// This module mirrors pages to local disk.
//
// Submodules:
// - assets: finds stylesheet / script / image / font references and rewrites them
// - download: fetches each asset once per local path
// - page: mirrors one page (fetch, download assets, rewrite, write index.html)
// - batch: mirrors a list of pages and aggregates the statistics
//
// Output layout:
//   <output>/<host>/pages/<path>/index.html
//   <output>/<host>/pages/<path>/{css,js,imgs,fonts}/...
//
// Rust concepts:
// - Modules: one file per stage of mirroring a page
// - pub use: the public API lives at mirror::*
// =============================================================================

mod assets;
mod batch;
mod download;
mod page;

pub use batch::{mirror_all, read_url_list, BatchReport, PageOutcome, PageReport};
pub use page::PageMirror;
