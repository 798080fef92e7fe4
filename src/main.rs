fn main() {
    if let Err(err) = pupilfuse_lib::run() {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
