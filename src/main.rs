fn main() {
    if let Err(e) = jerry::cli::main() {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}
