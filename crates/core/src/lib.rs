//! Core library for codeloom
//!
//! This crate implements the **Functional Core** of the codeloom application:
//! pure transformation and storage-format logic, free of orchestration,
//! networking, and terminal concerns. The `codeloom` binary crate is the
//! Imperative Shell that wires these functions to the Ollama API, the
//! filesystem, and the interactive review flow.
//!
//! Functions here are deterministic and testable with plain fixture data:
//!
//! - [`plan`]: parsing a planning response into a structured project plan
//! - [`diff`]: line-oriented change sets between two texts
//! - [`extract`]: cleaning generated file content out of a model response
//! - [`prompt`]: prompt assembly for planning, generation, and refactoring
//! - [`cache`]: the on-disk response cache record format and TTL policy
//!
//! The one deliberate exception to "no I/O" is [`cache`], which owns the
//! file-per-fingerprint persistence layout the same way pagination token
//! storage does in similar tools: the record format, keying, and expiry
//! policy are the logic under test, and they are inseparable from the files
//! that carry them.

pub mod cache;
pub mod diff;
pub mod extract;
pub mod plan;
pub mod prompt;
