fn main() {
    if let Err(e) = corec_drv::main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
