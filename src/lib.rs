// SPDX-License-Identifier: MPL-2.0

pub mod cli;
pub mod config;
pub mod logging;

pub use config::{AnthropicConfig, Config};
