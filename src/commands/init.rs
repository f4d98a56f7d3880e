use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file using `sheet_url` along with default settings
/// - Copies `secret_file` into its default location in the data dir.
///
/// # Arguments
/// - `accountant_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/accountant`
/// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON needed to start the Google
///   OAuth workflow. This will be copied from the `secret_file` path to its default location and
///   name in the data directory.
/// - `sheet_url` - The URL of the Google Sheet that holds one ledger tab per month, newest first.
///
/// # Errors
/// - Returns an error if any file operations fail.
pub async fn init(accountant_home: &Path, secret_file: &Path, sheet_url: &str) -> Result<Out<()>> {
    let config = Config::create(accountant_home, secret_file, sheet_url).await?;
    Ok(format!(
        "Successfully created the accountant directory at {}. Run 'accountant auth' next.",
        config.root().display()
    )
    .into())
}
