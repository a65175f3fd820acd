use anyhow::Result;
use clap::Parser;

mod app;
mod console;

fn main() -> Result<()> {
    let args = app::Args::parse();
    app::Session::new(args)?.run()
}
