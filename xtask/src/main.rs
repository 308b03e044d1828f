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

// Build automation and asset tasks for Lumen
// Run with: cargo xtask <command>

mod commands;
mod helpers;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask", version, about = "Lumen build automation", disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Task>,
}

#[derive(Subcommand)]
enum Task {
    /// Build all crates in the workspace.
    Build,
    /// Run all tests in the workspace.
    Test,
    /// Run `cargo check` on all crates.
    Check,
    /// Format all code in the workspace.
    Format,
    /// Run clippy on all crates with warnings as errors.
    Clippy,
    /// Run all CI tasks.
    All,
    /// Asset pipeline commands.
    Assets {
        #[command(subcommand)]
        command: AssetTask,
    },
}

#[derive(Subcommand)]
enum AssetTask {
    /// Compile the asset sources listed in the manifest into a pack.
    Compile {
        /// Path of the asset manifest.
        #[arg(long, default_value = "Assets.toml")]
        manifest: PathBuf,
    },
}

fn main() -> Result<()> {
    lumen_infra::logging::init();
    let Some(command) = Cli::parse().command else {
        helpers::print_custom_help();
        return Ok(());
    };
    match command {
        Task::Build => commands::ci::build(),
        Task::Test => commands::ci::test(),
        Task::Check => commands::ci::check(),
        Task::Format => commands::ci::format(),
        Task::Clippy => commands::ci::clippy(),
        Task::All => commands::ci::all(),
        Task::Assets { command } => match command {
            AssetTask::Compile { manifest } => commands::assets::compile(&manifest),
        },
    }
}
