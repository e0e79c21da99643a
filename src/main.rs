fn main() -> utmi::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    utmi::cli::run()
}
