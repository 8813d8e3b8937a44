//! Automates the monthly notebook cycle: trigger a full notebook run in the
//! hosting editor, wait it out, run the extraction script, optionally reset
//! the runtime, then advance the notebook's `year = YYYYMM` parameter one
//! month and go again until the last month has run.

pub mod advancer;
pub mod config;
pub mod controller;
pub mod document;
pub mod extract;
pub mod host;
pub mod runlog;
