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

use crate::helpers::*;
use anyhow::Result;
use std::time::Instant;

/// A cargo invocation run by the CI pipeline.
struct CiTask {
    name: &'static str,
    symbol: &'static str,
    color: &'static str,
    info: &'static str,
    args: &'static [&'static str],
}

const BUILD_TASK: CiTask = CiTask {
    name: "Build",
    symbol: HAMMER,
    color: BLUE,
    info: "Compiling the Lumen crates in debug mode",
    args: &["build", "--workspace", "--exclude", "xtask"],
};

const TEST_TASK: CiTask = CiTask {
    name: "Tests",
    symbol: TEST_TUBE,
    color: GREEN,
    info: "Running unit tests, integration tests and doc tests",
    args: &["test", "--workspace"],
};

const CHECK_TASK: CiTask = CiTask {
    name: "Check",
    symbol: MAGNIFIER,
    color: CYAN,
    info: "Checking code for errors without building executables",
    args: &["check", "--workspace", "--all-targets"],
};

// `fmt` takes `--all`, not `--workspace`.
const FORMAT_TASK: CiTask = CiTask {
    name: "Format",
    symbol: BRUSH,
    color: MAGENTA,
    info: "Formatting code using rustfmt with default settings",
    args: &["fmt", "--all"],
};

const CLIPPY_TASK: CiTask = CiTask {
    name: "Clippy",
    symbol: CLIPPY,
    color: YELLOW,
    info: "Running Clippy linter with warnings as errors",
    args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
};

const PIPELINE: [&CiTask; 5] = [&BUILD_TASK, &TEST_TASK, &CHECK_TASK, &FORMAT_TASK, &CLIPPY_TASK];

fn run(task: &CiTask) -> Result<()> {
    print_task_start(task.name, task.symbol, task.color);
    print_info(task.info);
    execute_command("cargo", task.args, task.name)
}

pub fn build() -> Result<()> {
    run(&BUILD_TASK)
}

pub fn test() -> Result<()> {
    run(&TEST_TASK)
}

pub fn check() -> Result<()> {
    run(&CHECK_TASK)
}

pub fn format() -> Result<()> {
    run(&FORMAT_TASK)
}

pub fn clippy() -> Result<()> {
    run(&CLIPPY_TASK)
}

/// Runs every task, continuing after failures, and fails if any did.
pub fn all() -> Result<()> {
    println!("{}", BANNER);
    println!("{}{}Starting full build pipeline...{}", BOLD, CYAN, RESET);

    let start_time = Instant::now();
    let failed: Vec<&str> = PIPELINE
        .iter()
        .enumerate()
        .filter_map(|(index, task)| {
            println!("\n{}{}[{}/{}] {}{}", BOLD, BLUE, index + 1, PIPELINE.len(), task.name, RESET);
            run(task).err().map(|_| task.name)
        })
        .collect();

    println!("\n{}{}━━━ Pipeline summary ━━━{}", BOLD, CYAN, RESET);
    if failed.is_empty() {
        print_success(&format!("All {} tasks completed successfully {}", PIPELINE.len(), ROCKET));
    } else {
        print_error(&format!("Failed: {}", failed.join(", ")));
    }
    println!(
        "{}{}Total time: {:.2}s{}",
        BOLD,
        BLUE,
        start_time.elapsed().as_secs_f64(),
        RESET
    );

    if !failed.is_empty() {
        anyhow::bail!("Pipeline failed: {}/{} tasks succeeded", PIPELINE.len() - failed.len(), PIPELINE.len());
    }
    Ok(())
}
