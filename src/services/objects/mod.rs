use std::path::PathBuf;

use async_trait::async_trait;
use derive_more::Display;

use crate::utils::crypto::generate_uuid;

#[derive(Debug, Display)]
pub enum ObjectError {
    UnsupportedType,
    Io(std::io::Error),
}

/// Binary uploads (currently just avatars). Returns a public URL on upload;
/// delete takes the same URL back.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> Result<String, ObjectError>;
    async fn delete(&self, url: &str) -> Result<(), ObjectError>;
}

pub struct FsObjectStore {
    dir: PathBuf,
    base_url: String,
}

impl FsObjectStore {
    pub fn new(dir: PathBuf, base_url: String) -> Self {
        Self { dir, base_url }
    }

    fn extension_for(content_type: &str) -> Result<&'static str, ObjectError> {
        match content_type {
            "image/png" => Ok("png"),
            "image/jpeg" => Ok("jpg"),
            "image/webp" => Ok("webp"),
            _ => Err(ObjectError::UnsupportedType),
        }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> Result<String, ObjectError> {
        let extension = Self::extension_for(content_type)?;
        let file_name = format!("{}.{}", generate_uuid(), extension);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(ObjectError::Io)?;
        tokio::fs::write(self.dir.join(&file_name), data)
            .await
            .map_err(ObjectError::Io)?;

        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), file_name))
    }

    async fn delete(&self, url: &str) -> Result<(), ObjectError> {
        // The URL tail is the file name we generated on upload.
        let file_name = match url.rsplit('/').next() {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(()),
        };

        match tokio::fs::remove_file(self.dir.join(file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ObjectError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_image_types_are_accepted() {
        assert!(FsObjectStore::extension_for("image/png").is_ok());
        assert!(FsObjectStore::extension_for("image/jpeg").is_ok());
        assert!(FsObjectStore::extension_for("image/webp").is_ok());
        assert!(matches!(
            FsObjectStore::extension_for("application/pdf"),
            Err(ObjectError::UnsupportedType)
        ));
    }
}
