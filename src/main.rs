mod app;
mod commands;
mod config;
mod logging;
mod news;
mod player;
mod ui;
mod visualizer;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = app::run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
