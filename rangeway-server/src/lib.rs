// Copyright 2026 Rangeway Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rangeway Server - range streaming proxy in front of object storage.
//!
//! This crate provides the server binary: configuration loading,
//! backend bootstrap, HTTP and HTTPS listeners with graceful shutdown.

pub mod app;
pub mod config;

pub use app::App;
pub use config::{parse_size, BackendKind, Config};
