fn main() -> std::process::ExitCode {
    intake_lib::run()
}
