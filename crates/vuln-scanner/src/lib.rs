#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Scan failure causes (`ScanError`)
//! - [`report`]: Scanner output model (`Finding`, `ScanTarget`, `ScanResult`) and parsing
//! - [`rank`]: Severity precedence (`rank_findings`, `severity_rank`, `SeverityCounts`)
//! - [`scanner`]: Strategy selection and execution (`ImageScanner`, `ScanRequest`)

pub mod error;
pub mod rank;
pub mod report;
pub mod scanner;

pub use error::ScanError;
pub use rank::{SeverityCounts, UNRECOGNIZED_RANK, rank_findings, severity_rank};
pub use report::{Finding, ScanOutcome, ScanResult, ScanTarget, parse_report};
pub use scanner::{ImageScanner, ScanRequest, find_image};
