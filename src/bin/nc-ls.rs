use std::process::ExitCode;

use anyhow::Result;
use nc_language_server::config::Config;
use nc_language_server::lsp::serve;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = Config::from_args_and_env()?;
    config.init_logging()?;
    let code = serve(config).await?;
    Ok(ExitCode::from(code))
}
