use crate::error::{Result, UupError};
use crate::utils::fs;
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;
use tar::Archive;
use zip::ZipArchive;

pub struct ArchiveExtractor;

impl Default for ArchiveExtractor {
    fn default() -> Self {
        Self
    }
}

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Unpacks every entry of `archive_path` into `destination`.
    ///
    /// The format follows the file name: `.tar.gz`/`.tgz` are unpacked as
    /// gzipped tarballs, anything else is read as zip, which is what the
    /// upstream package service produces.
    pub fn extract(&self, archive_path: &Path, destination: &Path) -> Result<()> {
        println!(
            "📦 Extracting {} to {}",
            archive_path.display(),
            destination.display()
        );

        fs::ensure_dir_exists(destination)?;

        let file_name = archive_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| UupError::archive_error(archive_path, "invalid archive file name"))?;

        if file_name.ends_with(".tar.gz") || file_name.ends_with(".tgz") {
            self.extract_tar_gz(archive_path, destination)?;
        } else {
            self.extract_zip(archive_path, destination)?;
        }

        println!("✅ Extraction completed");
        Ok(())
    }

    fn extract_tar_gz(&self, archive_path: &Path, destination: &Path) -> Result<()> {
        let file = File::open(archive_path)
            .map_err(|e| UupError::archive_error(archive_path, e.to_string()))?;
        let decoder = GzDecoder::new(file);
        let mut archive = Archive::new(decoder);
        archive
            .unpack(destination)
            .map_err(|e| UupError::archive_error(archive_path, e.to_string()))
    }

    fn extract_zip(&self, archive_path: &Path, destination: &Path) -> Result<()> {
        let corrupt = |message: String| UupError::archive_error(archive_path, message);

        let file = File::open(archive_path).map_err(|e| corrupt(e.to_string()))?;
        let mut archive = ZipArchive::new(file).map_err(|e| corrupt(e.to_string()))?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| corrupt(e.to_string()))?;
            let outpath = match entry.enclosed_name() {
                Some(path) => destination.join(path),
                None => continue,
            };

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath).map_err(|e| corrupt(e.to_string()))?;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent).map_err(|e| corrupt(e.to_string()))?;
            }
            let mut outfile = File::create(&outpath).map_err(|e| corrupt(e.to_string()))?;
            std::io::copy(&mut entry, &mut outfile)
                .map_err(|e| corrupt(format!("{}: {e}", entry.name())))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                        .map_err(|e| corrupt(format!("{}: {e}", entry.name())))?;
                }
            }
        }
        Ok(())
    }
}
