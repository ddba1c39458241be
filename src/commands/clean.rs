//! Clean the public directory

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::cache::CACHE_DIR;

/// Clean the public directory and the generation manifest
pub fn run(base_dir: &Path, public_dir: &Path) -> Result<()> {
    if public_dir.exists() {
        fs::remove_dir_all(public_dir)?;
        tracing::info!("Deleted: {:?}", public_dir);
    }

    let cache_dir = base_dir.join(CACHE_DIR);
    if cache_dir.exists() {
        fs::remove_dir_all(&cache_dir)?;
        tracing::info!("Deleted: {:?}", cache_dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::InMemoryClient;
    use crate::config::SiteConfig;
    use crate::Spacetraveling;
    use std::sync::Arc;

    #[test]
    fn test_removes_output_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let site = Spacetraveling::with_client(
            dir.path(),
            SiteConfig::default(),
            Arc::new(InMemoryClient::new()),
        );
        fs::create_dir_all(site.public_dir.join("post/hooks")).unwrap();
        fs::create_dir_all(dir.path().join(CACHE_DIR)).unwrap();

        site.clean().unwrap();

        assert!(!site.public_dir.exists());
        assert!(!dir.path().join(CACHE_DIR).exists());
        // Nothing left to clean is not an error
        run(dir.path(), &site.public_dir).unwrap();
    }
}
