use anyhow::Result;
use chatbot::cli;

fn main() -> Result<()> {
    cli::run()
}
