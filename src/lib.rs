//! # vmforge - Azure VM Infrastructure Template Generator
//!
//! vmforge turns small configuration maps into ARM (Azure Resource Manager)
//! JSON resource definitions for VM infrastructure: availability sets and
//! zones, scale sets, backup vaults and policies, managed disks, monitoring,
//! extensions, autoscaling, replication, and workbooks. Around that catalog
//! it provides a template helper layer, VHD Marketplace validation, and an
//! approval-gated cleanup runner for Recovery Services vaults.
//!
//! ## Core Concepts
//!
//! - **Generators**: named units that validate a parameter map and emit one
//!   ARM resource object
//! - **Registry**: the catalog mapping helper names (`availability_set`,
//!   `backup_policy`, ...) to generators
//! - **ValidationReport**: structured errors, warnings, and recommendations
//!   from a validation pass
//! - **Helpers**: a minijinja environment exposing each generator as a
//!   template function
//! - **Approvals**: file-backed, hash-keyed tokens gating destructive vault
//!   cleanup
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     CLI Interface                         │
//! │               (clap-based command parsing)                │
//! └──────────────────────────────────────────────────────────┘
//!                            │
//!        ┌───────────────────┼────────────────────┐
//!        ▼                   ▼                    ▼
//! ┌──────────────┐  ┌─────────────────┐  ┌────────────────────┐
//! │  Generator   │  │ Template Helpers│  │  VHD / Cleanup /   │
//! │  Registry    │  │   (minijinja)   │  │  Approval plumbing │
//! └──────────────┘  └─────────────────┘  └────────────────────┘
//!        │                   │
//!        └───────────────────┘
//!                 ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │           ARM JSON documents (serde_json)                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust
//! use vmforge::generators::{GeneratorParams, GeneratorRegistry};
//! use serde_json::json;
//!
//! let registry = GeneratorRegistry::with_builtins();
//!
//! let mut params = GeneratorParams::new();
//! params.insert("name".to_string(), json!("web-avset"));
//! params.insert("location".to_string(), json!("eastus"));
//!
//! let resource = registry.run("availability_set", &params).unwrap();
//! assert_eq!(resource["type"], "Microsoft.Compute/availabilitySets");
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod approval;
pub mod arm;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod generators;
pub mod helpers;
pub mod vhd;

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::approval::{ApprovalManager, ApprovalRecord};
    pub use crate::arm::TemplateBuilder;
    pub use crate::cleanup::{CleanupReport, CleanupRequest, CleanupRunner};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorContext, Result};
    pub use crate::generators::{
        Generator, GeneratorParams, GeneratorRegistry, ParamExt, ValidationReport,
    };
    pub use crate::vhd::VhdFooter;
}

/// Crate version string.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
