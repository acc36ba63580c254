// permc library surface: edit scripting, reports, exit codes.
// The binary in main.rs is a thin clap front end over these.

pub mod edit;
pub mod exit_codes;
pub mod report;
