use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "wetterweiser_cache";

pub fn get_cache_dir() -> io::Result<PathBuf> {
    dirs::cache_dir()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine system cache directory",
            )
        })
        .map(|p| p.join(CACHE_DIR_NAME))
}

pub fn ensure_cache_dir_exists(path: &Path) -> io::Result<()> {
    match std::fs::metadata(path) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!(
                        "Cache path exists but is not a directory: {}",
                        path.display()
                    ),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("Creating cache directory: {}", path.display());
            std::fs::create_dir_all(path)
        }
        Err(e) => Err(e),
    }
}

/// Rounds to one decimal place, the precision every derived value is reported in.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round1() {
        assert_eq!(round1(28.571_428), 28.6);
        assert_eq!(round1(-1.25), -1.3);
        assert_eq!(round1(0.04), 0.0);
    }

    #[test]
    fn test_ensure_cache_dir_exists_creates_and_rejects_files(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let nested = tmp.path().join("a").join("b");
        ensure_cache_dir_exists(&nested)?;
        assert!(nested.is_dir());

        let file = tmp.path().join("file");
        std::fs::write(&file, b"x")?;
        assert!(ensure_cache_dir_exists(&file).is_err());
        Ok(())
    }
}
