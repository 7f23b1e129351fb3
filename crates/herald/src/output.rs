use crate::error::Result;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write;

/// Emit a GitHub Actions output when `GITHUB_OUTPUT` is set.
pub fn emit_github_output(key: &str, value: &str) -> Result<()> {
    emit_github_output_with_env(key, value, |key| std::env::var_os(key))
}

pub fn emit_github_output_with_env<F>(key: &str, value: &str, env_var_os: F) -> Result<()>
where
    F: Fn(&str) -> Option<OsString>,
{
    if let Some(path) = env_var_os("GITHUB_OUTPUT") {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}={}", key, value)?;
    }
    Ok(())
}
