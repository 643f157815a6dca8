//! Data layer: core types, loading, indexing and filtering.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  parse file → relabel, drop incomplete rows, add `count`
//!   └──────────┘
//!        │            (cache: one parse per source path)
//!        ▼
//!   ┌──────────────────┐
//!   │ PassengerDataset │  Vec<Passenger>, column order
//!   └──────────────────┘
//!        │                       │
//!        ▼                       ▼
//!   ┌──────────┐           ┌──────────┐
//!   │  index   │ domains → │  filter  │  FilterState → FilteredView
//!   └──────────┘           └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  stats   │  describe() for the description page
//!   └──────────┘
//! ```

pub mod cache;
pub mod filter;
pub mod index;
pub mod loader;
pub mod model;
pub mod stats;
