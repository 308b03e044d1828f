// Copyright 2025 eraflo
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

//! Logging bootstrap for binaries and tools.

use env_logger::{Builder, Env};

/// Installs the global logger: `info` unless `RUST_LOG` says otherwise.
///
/// Calling it again after a logger is installed does nothing.
pub fn init() {
    init_with_default_filter("info");
}

/// Installs the global logger with `filter` as the default filter.
pub fn init_with_default_filter(filter: &str) {
    let result = Builder::from_env(Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .try_init();
    if result.is_ok() {
        log::debug!("Logger initialized, default filter '{}'", filter);
    }
}
