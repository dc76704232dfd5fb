// ABOUTME: Constants for the driver: version, prompt, and exit codes

pub const VERSION: &str = "0.1.0";
pub const PROMPT: &str = "> ";
pub const USAGE: &str = "Usage: lox [script]";
pub const HISTORY_FILE: &str = ".lox_history";

// Exit codes follow the sysexits convention
pub const EXIT_USAGE: i32 = 64;
pub const EXIT_COMPILE_ERROR: i32 = 65;
pub const EXIT_RUNTIME_ERROR: i32 = 70;
pub const EXIT_IO_ERROR: i32 = 74;
