//! Command-line entry point (native).

#[cfg(feature = "native")]
#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    use clap::Parser;

    env_logger::init();
    let cli = memeforge_app::cli::Cli::parse();

    match memeforge_app::cli::run(cli).await {
        Ok(message) => {
            println!("{}", message);
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{:?}", e);
            eprintln!("error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
