fn main() {
    if let Err(e) = retro_lib::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
