//! Terminal tables for CLI output.

pub mod tables;

pub use tables::{
    TableBuilder, create_compaction_table, create_hits_table, create_outfit_tables,
    create_stats_table,
};
