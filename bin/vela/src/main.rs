fn main() {
    if let Err(err) = vela::cli::run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
