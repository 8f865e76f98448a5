use std::process::ExitCode;

fn main() -> ExitCode {
  sleep_log_lib::run()
}
