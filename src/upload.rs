use crate::error::TryOnError;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use std::{fmt, path::Path};

/// Largest accepted image, in bytes (10 MB).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Which of the two inputs an image fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageRole {
    /// The user's own photo.
    Subject,
    /// The clothing item to try on.
    Garment,
}

impl ImageRole {
    /// Returns the role as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageRole::Subject => "subject",
            ImageRole::Garment => "garment",
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file as handed over by a file picker: name, declared media type and contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, declaring its media type from the extension.
    ///
    /// The declared type and on-disk size are checked before any byte is read.
    pub fn from_path(path: &Path) -> Result<Self, TryOnError> {
        let mime_type = mime_for_path(path);
        check_declared(mime_type, std::fs::metadata(path)?.len())?;
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            name,
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Media type for a path based on its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Checks the declared media type first, then the size.
pub fn validate_image(file: &SelectedFile) -> Result<(), TryOnError> {
    check_declared(&file.mime_type, file.size_bytes())
}

fn check_declared(mime_type: &str, size: u64) -> Result<(), TryOnError> {
    if !mime_type.starts_with("image/") {
        return Err(TryOnError::InvalidFileType(mime_type.to_string()));
    }
    if size > MAX_IMAGE_BYTES {
        return Err(TryOnError::FileTooLarge {
            size,
            limit: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

/// An accepted image held in memory for the current session.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub preview_url: String,
}

impl UploadedImage {
    /// Validates the file and builds its data-URL preview.
    pub fn from_file(file: SelectedFile) -> Result<Self, TryOnError> {
        validate_image(&file)?;
        let preview_url = format!("data:{};base64,{}", file.mime_type, BASE64.encode(&file.bytes));
        Ok(Self {
            name: file.name,
            mime_type: file.mime_type,
            bytes: file.bytes,
            preview_url,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

// previews are whole images, keep them out of debug output
impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

/// One slot per role; setting a slot replaces whatever was there.
#[derive(Clone, Debug, Default)]
pub struct UploadSlots {
    subject: Option<UploadedImage>,
    garment: Option<UploadedImage>,
}

impl UploadSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, role: ImageRole) -> Option<&UploadedImage> {
        match role {
            ImageRole::Subject => self.subject.as_ref(),
            ImageRole::Garment => self.garment.as_ref(),
        }
    }

    pub fn set(&mut self, role: ImageRole, image: UploadedImage) {
        *self.slot_mut(role) = Some(image);
    }

    pub fn clear(&mut self, role: ImageRole) -> Option<UploadedImage> {
        self.slot_mut(role).take()
    }

    /// Both images, when both are present.
    pub fn both(&self) -> Option<(&UploadedImage, &UploadedImage)> {
        Some((self.subject.as_ref()?, self.garment.as_ref()?))
    }

    fn slot_mut(&mut self, role: ImageRole) -> &mut Option<UploadedImage> {
        match role {
            ImageRole::Subject => &mut self.subject,
            ImageRole::Garment => &mut self.garment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(mime_type: &str, size: usize) -> SelectedFile {
        SelectedFile::new("photo", mime_type, vec![7u8; size])
    }

    #[test]
    fn rejects_non_image_types() {
        for mime in ["application/pdf", "text/plain", "", "video/mp4", "imagex/png"] {
            let err = validate_image(&file(mime, 16)).unwrap_err();
            assert_eq!(err, TryOnError::InvalidFileType(mime.to_string()));
        }
    }

    #[test]
    fn rejects_files_over_ten_megabytes_regardless_of_type() {
        let too_big = MAX_IMAGE_BYTES as usize + 1;
        assert_eq!(
            validate_image(&file("image/png", too_big)).unwrap_err(),
            TryOnError::FileTooLarge {
                size: MAX_IMAGE_BYTES + 1,
                limit: MAX_IMAGE_BYTES
            }
        );
        assert!(validate_image(&file("application/zip", too_big)).is_err());
    }

    #[test]
    fn accepts_image_at_exactly_the_limit() {
        assert!(validate_image(&file("image/webp", MAX_IMAGE_BYTES as usize)).is_ok());
    }

    #[test]
    fn preview_is_a_data_url() {
        let image = UploadedImage::from_file(SelectedFile::new("a.png", "image/png", b"png".to_vec()))
            .unwrap();
        assert_eq!(image.preview_url, "data:image/png;base64,cG5n");
        assert_eq!(image.size_bytes(), 3);
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_for_path(Path::new("me.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("shirt.png")), "image/png");
        assert_eq!(mime_for_path(Path::new("shirt.webp")), "image/webp");
        assert_eq!(mime_for_path(Path::new("notes.txt")), "application/octet-stream");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn from_path_rejects_oversized_file_from_its_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.png");
        // sparse: the length is set without writing the bytes
        std::fs::File::create(&path)
            .unwrap()
            .set_len(4 * 1024 * 1024 * 1024)
            .unwrap();

        assert_eq!(
            SelectedFile::from_path(&path).unwrap_err(),
            TryOnError::FileTooLarge {
                size: 4 * 1024 * 1024 * 1024,
                limit: MAX_IMAGE_BYTES
            }
        );
    }

    #[test]
    fn from_path_reads_accepted_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shirt.PNG");
        std::fs::write(&path, b"png").unwrap();

        let file = SelectedFile::from_path(&path).unwrap();
        assert_eq!(file, SelectedFile::new("shirt.PNG", "image/png", b"png".to_vec()));
    }

    #[test]
    fn slots_are_last_write_wins() {
        let mut slots = UploadSlots::new();
        let first = UploadedImage::from_file(SelectedFile::new("1.png", "image/png", vec![1])).unwrap();
        let second = UploadedImage::from_file(SelectedFile::new("2.png", "image/png", vec![2])).unwrap();

        slots.set(ImageRole::Subject, first);
        slots.set(ImageRole::Subject, second.clone());
        assert_eq!(slots.get(ImageRole::Subject), Some(&second));
        assert!(slots.both().is_none());

        slots.set(ImageRole::Garment, second.clone());
        assert!(slots.both().is_some());

        assert_eq!(slots.clear(ImageRole::Garment), Some(second));
        assert!(slots.get(ImageRole::Garment).is_none());
    }
}
