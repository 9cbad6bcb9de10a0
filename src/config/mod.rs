//! Configuration module for Site-Mirror
//!
//! This module handles loading, parsing, and validating the TOML configuration
//! file and the seed page list it points at.
//!
//! # Example
//!
//! ```no_run
//! use site_mirror::config::{load_config, load_seed_list};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! let seeds = load_seed_list(&config.input.pages_file).unwrap();
//! println!("{} seed pages for {}", seeds.len(), config.crawler.target_domain);
//! ```

mod parser;
mod seeds;
mod types;
mod validation;

pub use types::{Config, CrawlerConfig, InputConfig, OutputConfig, RetryConfig, RetryMode};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use seeds::{load_seed_list, parse_seed_list};
