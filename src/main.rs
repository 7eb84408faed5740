mod cli;
mod config;
mod error;
mod frame;
mod gestures;
mod logging;
mod machine;
mod motion;
mod render;
mod session;
mod source;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
