// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod bus;            // publish/subscribe kernel
pub mod config;         // config loading + validation
pub mod crisis;         // crisis escalation pipeline
pub mod errors;         // error handling
pub mod observability;
pub mod traits;         // handler + pacing abstractions
