use anyhow::Result;
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

/// Fail unless `path` names an existing file.
pub fn validate_input_file(path: &str) -> Result<()> {
    let pb = PathBuf::from(path);
    if path.is_empty() {
        anyhow::bail!("No input file given");
    }
    if !pb.is_file() {
        anyhow::bail!("File does not exist: {}", path);
    }
    Ok(())
}

/// Fail unless `path` names a directory holding a model artifact.
pub fn validate_artifact_dir(path: &str) -> Result<()> {
    let pb = PathBuf::from(path);
    if !pb.is_dir() {
        anyhow::bail!("Model artifact directory does not exist: {}", path);
    }
    for file in ["classifier.json", "schema.json"] {
        if !pb.join(file).is_file() {
            anyhow::bail!("Model artifact directory {} has no {}", path, file);
        }
    }
    Ok(())
}

pub fn write_bytes_to_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path.as_ref())?;
    file.write_all(bytes)?;
    Ok(())
}
