use crate::error::Result;
use std::path::Path;
use tracing::{debug, warn};

/// Read seed URLs, one per line. A missing file yields `None`.
pub fn read_seed_file(path: &Path) -> Result<Option<Vec<String>>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(parse_seeds(&content))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("No seed file at {}, skipping seeding", path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Blank lines and `#` comments are ignored; whitespace is trimmed.
pub fn parse_seeds(content: &str) -> Vec<String> {
    let seeds: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    debug!("Parsed {} seed URLs", seeds.len());
    seeds
}
