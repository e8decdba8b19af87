//! Metadata cache, matching engine, destination builder, linker,
//! processed-file cache, and watcher — the core subsystems a
//! `Processor` orchestrates through one pass.

pub mod destination;
pub mod error;
pub mod fingerprint;
pub mod linker;
pub mod matching;
pub mod metadata;
pub mod pattern;
pub mod processed_cache;
pub mod processor;
pub mod structured_parser;
pub mod watch;
