use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context};

/// True when `oso` is missing or older than `osl`.
pub(crate) fn needs_compile(osl: &Path, oso: &Path) -> io::Result<bool> {
    let source = fs::metadata(osl)?.modified()?;
    match fs::metadata(oso) {
        Ok(meta) => Ok(meta.modified()? < source),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(err) => Err(err),
    }
}

/// Compiles `NAME.osl` to `NAME.oso` with `oslc` where needed.
pub(crate) fn compile_shaders(names: &[String]) -> anyhow::Result<()> {
    for name in names {
        let osl = PathBuf::from(format!("{name}.osl"));
        let oso = osl.with_extension("oso");
        if !needs_compile(&osl, &oso).with_context(|| format!("checking shader {osl:?}"))? {
            tracing::debug!(shader = %name, "shader up to date");
            continue;
        }
        tracing::info!(shader = %name, "compiling shader");
        let status = Command::new("oslc")
            .arg(&osl)
            .status()
            .context("failed to run oslc")?;
        if !status.success() {
            bail!("oslc failed on {osl:?} ({status})");
        }
    }
    Ok(())
}
