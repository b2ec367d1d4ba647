//! Access to the CPython source distribution
//!
//! Both the release tarball (`Python-X.Y.Z.tgz` or an uncompressed `.tar`) and
//! an already extracted tree are supported. Only the two manifests needed for
//! reconciliation are read.

use crate::errors::{ManifestError, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The distribution files the engine consumes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistManifests {
    /// `Modules/Setup`
    pub setup: String,
    /// `Modules/config.c.in`
    pub config_c_in: String,
}

/// Archive-relative path of `Modules/Setup`
pub fn setup_member(python_version: &str) -> String {
    format!("Python-{}/Modules/Setup", python_version)
}

/// Archive-relative path of `Modules/config.c.in`
pub fn config_c_in_member(python_version: &str) -> String {
    format!("Python-{}/Modules/config.c.in", python_version)
}

/// Read the distribution manifests from a tarball or source directory
pub fn read_dist_manifests(source: &Path, python_version: &str) -> Result<DistManifests> {
    if source.is_dir() {
        read_from_directory(source, python_version)
    } else {
        read_from_tarball(source, python_version)
    }
}

fn read_from_directory(root: &Path, python_version: &str) -> Result<DistManifests> {
    // Accept either the directory holding `Python-X.Y.Z/` or that directory itself.
    let nested = root.join(format!("Python-{}", python_version));
    let tree = if nested.is_dir() { nested } else { root.to_path_buf() };
    debug!("Reading distribution manifests from {:?}", tree);

    let read = |relative: &str, member: String| -> Result<String> {
        let path: PathBuf = tree.join(relative);
        if !path.is_file() {
            return Err(ManifestError::MissingDistFile { path: member });
        }
        Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned())
    };

    Ok(DistManifests {
        setup: read("Modules/Setup", setup_member(python_version))?,
        config_c_in: read("Modules/config.c.in", config_c_in_member(python_version))?,
    })
}

fn read_from_tarball(path: &Path, python_version: &str) -> Result<DistManifests> {
    debug!("Reading distribution manifests from archive {:?}", path);
    let mut file = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 2];
    let gzipped = match file.read_exact(&mut magic) {
        Ok(()) => magic == GZIP_MAGIC,
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(err) => return Err(err.into()),
    };
    file.seek(SeekFrom::Start(0))?;

    if gzipped {
        extract_members(GzDecoder::new(file), python_version)
    } else {
        extract_members(file, python_version)
    }
}

fn extract_members<R: Read>(reader: R, python_version: &str) -> Result<DistManifests> {
    let setup_path = setup_member(python_version);
    let config_c_path = config_c_in_member(python_version);

    let mut setup = None;
    let mut config_c_in = None;

    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.to_string_lossy().into_owned();
        let entry_path = entry_path.strip_prefix("./").unwrap_or(&entry_path);

        let slot = if entry_path == setup_path {
            &mut setup
        } else if entry_path == config_c_path {
            &mut config_c_in
        } else {
            continue;
        };

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        *slot = Some(String::from_utf8_lossy(&bytes).into_owned());

        if setup.is_some() && config_c_in.is_some() {
            break;
        }
    }

    Ok(DistManifests {
        setup: setup.ok_or(ManifestError::MissingDistFile { path: setup_path })?,
        config_c_in: config_c_in.ok_or(ManifestError::MissingDistFile {
            path: config_c_path,
        })?,
    })
}
