// crates/kpi-board-cli/src/lib.rs
// ============================================================================
// Module: KPI Board CLI Library
// Description: Board feed, rendering, and i18n used by the `kpi-board` binary.
// Purpose: Keep CLI logic testable outside the entry point.
// Dependencies: kpi-board-core, kpi-board-config, reqwest
// ============================================================================

//! ## Overview
//! Library half of the `kpi-board` CLI. The binary in `main.rs` parses
//! arguments and dispatches; everything with behavior worth testing lives here.

pub mod feed;
pub mod i18n;
pub mod render;

pub use feed::BoardFeed;
pub use feed::FeedError;
pub use feed::FeedNotice;
pub use feed::FeedSettings;
pub use feed::FeedSnapshot;
pub use feed::FeedSource;
pub use feed::MAX_FEED_RESPONSE_BYTES;
