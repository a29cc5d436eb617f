// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod bus;
mod config;

pub use bus::{HandlerError, HandlerFailure, RegistrationError, RequestError};
pub use config::{ConfigError, ValidationError};
