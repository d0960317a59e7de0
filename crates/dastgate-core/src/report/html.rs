//! HTML report rendered by the scanner itself.

use crate::client::ScannerApi;
use crate::error::Result;
use std::path::Path;
use tracing::info;

pub async fn export<C: ScannerApi + ?Sized>(client: &C, output_path: &Path) -> Result<()> {
    let html = client.html_report().await?;
    std::fs::write(output_path, html)?;
    info!("HTML report saved to {}", output_path.display());
    Ok(())
}
