use super::start::StartArgs;

/// Print the configuration the timer would run with, flags applied.
pub fn run(args: StartArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.effective_config()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
