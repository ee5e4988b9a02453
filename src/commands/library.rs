use crate::services::vision::ReferenceLibrary;
use anyhow::{Context, Result};
use std::path::Path;

/// Identifiers in the order ties are broken during matching
pub fn run(dir: &Path, probe_size: u32) -> Result<Vec<String>> {
    let library = ReferenceLibrary::load(dir, probe_size)
        .with_context(|| format!("failed to load portraits from {}", dir.display()))?;

    let ids: Vec<String> = library.ids().map(str::to_string).collect();
    for id in &ids {
        println!("{}", id);
    }
    Ok(ids)
}
