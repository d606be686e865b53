fn main() {
    if let Err(err) = gateflow::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
