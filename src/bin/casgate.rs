use anyhow::Result;
use casgate::cli::start;

// Main function
fn main() -> Result<()> {
    // Start the program
    let action = start()?;

    // Handle the action
    action.execute()
}
