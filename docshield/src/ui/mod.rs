// docshield/src/ui/mod.rs

pub mod output_format;
pub mod report_table;
pub mod theme;
