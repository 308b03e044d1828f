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

use anyhow::Result;
use std::process::Command;
use std::time::Instant;

// ANSI color codes
pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const GREEN: &str = "\x1b[32m";
pub const RED: &str = "\x1b[31m";
pub const BLUE: &str = "\x1b[34m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const MAGENTA: &str = "\x1b[35m";

// Visual symbols
pub const CHECK: &str = "✓";
pub const CROSS: &str = "✗";
pub const GEAR: &str = "⚙";
pub const ROCKET: &str = "🚀";
pub const HAMMER: &str = "🔨";
pub const TEST_TUBE: &str = "🧪";
pub const MAGNIFIER: &str = "🔍";
pub const BRUSH: &str = "🎨";
pub const CLIPPY: &str = "📎";
pub const PACKAGE: &str = "📦";

pub const BANNER: &str = concat!(
    "\x1b[1m\x1b[36m",
    "╔═══════════════════════════════════════════════════════════╗\n",
    "║                        ⚙  LUMEN  ⚙                        ║\n",
    "║             Renderer Runtime Build Automation             ║\n",
    "╚═══════════════════════════════════════════════════════════╝",
    "\x1b[0m"
);

pub fn print_custom_help() {
    println!("{}", BANNER);
    println!("\n{}{}Usage:{} cargo xtask <command>\n", BOLD, YELLOW, RESET);
    println!("{}Available commands:{}", BOLD, RESET);
    let commands = [
        (HAMMER, BLUE, "build", "Build all crates in the workspace."),
        (TEST_TUBE, GREEN, "test", "Run all tests in the workspace."),
        (MAGNIFIER, CYAN, "check", "Run `cargo check` on all crates."),
        (BRUSH, MAGENTA, "format", "Format all code in the workspace."),
        (CLIPPY, YELLOW, "clippy", "Run clippy with warnings as errors."),
        (ROCKET, RED, "all", "Run every CI task above."),
        (PACKAGE, CYAN, "assets compile", "Compile the sources of Assets.toml into a pack."),
    ];
    for (symbol, color, name, description) in commands {
        println!("  {} {}{}{:<15}{} - {}", symbol, color, BOLD, name, RESET, description);
    }
}

pub fn print_task_start(task_name: &str, emoji: &str, color: &str) {
    println!("\n{}{}━━━ {} {} {}━━━{}", BOLD, color, emoji, task_name, emoji, RESET);
}

pub fn print_success(message: &str) {
    println!("{}{} {} {}{}", BOLD, GREEN, CHECK, message, RESET);
}

pub fn print_error(message: &str) {
    println!("{}{} {} {}{}", BOLD, RED, CROSS, message, RESET);
}

pub fn print_info(message: &str) {
    println!("{}💡 Info:{} {}", BOLD, RESET, message);
}

/// Runs `cmd` with inherited output and fails if it exits unsuccessfully.
pub fn execute_command(cmd: &str, args: &[&str], task_name: &str) -> Result<()> {
    let start_time = Instant::now();
    println!("{}{}📋 Command:{} {} {}", BOLD, CYAN, RESET, cmd, args.join(" "));

    let status = Command::new(cmd).args(args).status()?;
    let seconds = start_time.elapsed().as_secs_f64();
    if status.success() {
        print_success(&format!("{} completed in {:.2}s", task_name, seconds));
        Ok(())
    } else {
        print_error(&format!("{} failed after {:.2}s", task_name, seconds));
        anyhow::bail!("{} failed with status: {}", task_name, status);
    }
}
