//! Community agent server binary.
//! Run with: cargo run --bin community-agent-server

use std::process::ExitCode;

use community_agent::start_agent;

fn main() -> ExitCode {
    start_agent::run()
}
