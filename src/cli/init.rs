use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::core::config::SAMPLE_CONFIG;
use crate::core::terminal::{GuideSection, print_success};

/// `echobot init`: write the sample config, refusing to clobber one.
pub async fn write_sample(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::write(path, SAMPLE_CONFIG)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    print_success(&format!("Wrote {}", path.display()));
    GuideSection::new("Next steps")
        .text("1. Fill in the channel ids and both players' Discord ids.")
        .text("2. Export DISCORD_TOKEN (and GEMINI_API_KEY for generated text).")
        .blank()
        .hint("echobot doctor", "")
        .hint("echobot run", "")
        .print();
    Ok(())
}
