use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = plantcoco::run() {
        eprintln!("error: {err}");
        process::exit(1);
    }
}
