// Module audio - mixing, buffer handoff and hardware output

pub mod backend;
pub mod config;
pub mod dsp_utils;
pub mod engine;
pub mod error;
pub mod export;
pub mod format_conversion;
pub mod handoff;
pub mod load_monitor;
pub mod mixer;
