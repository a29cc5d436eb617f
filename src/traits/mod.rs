// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod handler;
pub mod pacer;

pub use handler::{DispatchContext, EventHandler, FnHandler, HandlerRef};
pub use pacer::{FixedDelay, NoDelay, Pacer};
