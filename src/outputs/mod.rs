//! Flat-file outputs.
//!
//! - [`json`]: per-company article and post snapshots
//! - [`companies`]: the `company,location` input list
//!
//! ```text
//! data/
//! ├── input/
//! │   └── companies.csv
//! ├── output/
//! │   └── LAB Group LinkedIn Posts.json
//! └── LAB Group.json
//! ```
//!
//! Every file is overwritten on each run; nothing here is read back by the
//! pipeline except the company list.

pub mod companies;
pub mod json;
