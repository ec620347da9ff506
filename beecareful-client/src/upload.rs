//! Diagnosis photo upload: strip embedded metadata, announce the photos,
//! receive pre-signed slots, PUT every photo. The whole batch fails if any
//! slot is refused or any PUT fails.

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::models::{HiveId, PhotoMetadata, UploadSlot};
use futures::future::join_all;
use img_parts::jpeg::{markers, Jpeg};
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// PNG chunks carrying text or EXIF.
const PNG_METADATA_CHUNKS: [[u8; 4]; 4] = [*b"eXIf", *b"tEXt", *b"iTXt", *b"zTXt"];

pub const MAX_UPLOAD_IMAGE_COUNT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Photo {
    pub fn new(filename: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, std::io::Error> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let content_type = content_type_for(&filename);
        Ok(Self::new(&filename, content_type, bytes))
    }

    /// Same photo with EXIF (camera, GPS), XMP and comments removed.
    /// Pixel data, filename and content type are kept. Bytes that do not
    /// parse as the declared format, or formats without a stripper, are
    /// passed through.
    pub fn without_metadata(self) -> Self {
        let stripped = match self.content_type.as_str() {
            "image/jpeg" => strip_jpeg(&self.bytes),
            "image/png" => strip_png(&self.bytes),
            _ => {
                debug!("{}: no metadata stripper for {}", self.filename, self.content_type);
                return self;
            }
        };
        match stripped {
            Ok(bytes) => {
                debug!("{}: {} -> {} bytes after stripping", self.filename, self.bytes.len(), bytes.len());
                Self { bytes, ..self }
            }
            Err(e) => {
                warn!("{}: could not strip metadata: {}", self.filename, e);
                self
            }
        }
    }

    pub fn metadata(&self) -> PhotoMetadata {
        PhotoMetadata {
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
            expected_size: self.bytes.len() as u64,
        }
    }
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

fn strip_jpeg(bytes: &[u8]) -> Result<Vec<u8>, img_parts::Error> {
    let mut jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes))?;
    jpeg.set_exif(None);
    // APP1 also holds XMP
    jpeg.segments_mut()
        .retain(|s| s.marker() != markers::APP1 && s.marker() != markers::COM);
    Ok(jpeg.encoder().bytes().to_vec())
}

fn strip_png(bytes: &[u8]) -> Result<Vec<u8>, img_parts::Error> {
    let mut png = Png::from_bytes(Bytes::copy_from_slice(bytes))?;
    png.set_exif(None);
    png.chunks_mut().retain(|c| !PNG_METADATA_CHUNKS.contains(&c.kind()));
    Ok(png.encoder().bytes().to_vec())
}

pub fn build_metadata(photos: &[Photo]) -> Result<Vec<PhotoMetadata>, ApiError> {
    if photos.len() > MAX_UPLOAD_IMAGE_COUNT {
        return Err(ApiError::TooManyPhotos(photos.len()));
    }
    Ok(photos.iter().map(Photo::metadata).collect())
}

/// Pairs every slot with the photo of the same filename.
pub fn match_slots<'a>(
    photos: &'a [Photo],
    slots: &'a [UploadSlot],
) -> Result<Vec<(&'a UploadSlot, &'a Photo)>, ApiError> {
    let by_name: HashMap<&str, &Photo> = photos.iter().map(|p| (p.filename.as_str(), p)).collect();

    slots
        .iter()
        .map(|slot| {
            if slot.status > 0 {
                return Err(ApiError::Upload {
                    filename: slot.filename.clone(),
                    reason: format!("refused by server (status {})", slot.status),
                });
            }
            let photo = by_name.get(slot.filename.as_str()).ok_or_else(|| ApiError::Upload {
                filename: slot.filename.clone(),
                reason: "no photo with this filename".to_string(),
            })?;
            Ok((slot, *photo))
        })
        .collect()
}

/// PUTs all photos concurrently. Succeeds only if every PUT succeeded.
pub async fn upload_photos(client: &ApiClient, photos: &[Photo], slots: &[UploadSlot]) -> Result<(), ApiError> {
    let pairs = match_slots(photos, slots)?;

    let results = join_all(pairs.iter().map(|(slot, photo)| async move {
        let outcome = client
            .put_presigned(&slot.pre_signed_url, &photo.content_type, photo.bytes.clone())
            .await;
        (slot.filename.clone(), outcome)
    }))
    .await;

    for (filename, outcome) in results {
        if let Err(e) = outcome {
            warn!("upload of {} failed: {}", filename, e);
            return Err(ApiError::Upload {
                filename,
                reason: e.to_string(),
            });
        }
    }
    info!("uploaded {} photos", pairs.len());
    Ok(())
}

/// Full diagnosis request: strip, metadata, slots, upload.
pub async fn diagnose(client: &ApiClient, hive: HiveId, photos: &[Photo]) -> Result<Vec<UploadSlot>, ApiError> {
    if photos.len() > MAX_UPLOAD_IMAGE_COUNT {
        return Err(ApiError::TooManyPhotos(photos.len()));
    }
    let photos: Vec<Photo> = photos.iter().cloned().map(Photo::without_metadata).collect();
    let metadata = build_metadata(&photos)?;
    let slots = client.request_diagnosis(hive, &metadata).await?;
    upload_photos(client, &photos, &slots).await?;
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LoginRequest;
    use crate::session::MemorySessionStore;
    use beecareful_devkit::{fixtures, MockBackend};
    use std::sync::Arc;

    fn photos(n: usize) -> Vec<Photo> {
        (0..n)
            .map(|i| Photo::new(&format!("frame{i}.jpg"), "image/jpeg", vec![i as u8; 16]))
            .collect()
    }

    const EXIF_PAYLOAD: &[u8] = b"Exif\0\0GPS-52.52N-13.40E";

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let len = (payload.len() + 2) as u16;
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// SOI, APP0, APP1 Exif, COM, SOS with a little scan data, EOI.
    fn jpeg_with_exif() -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        out.extend(segment(0xE0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0"));
        out.extend(segment(0xE1, EXIF_PAYLOAD));
        out.extend(segment(0xFE, b"shot on hive 3"));
        out.extend(segment(0xDA, &[0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]));
        out.extend_from_slice(&[0x12, 0x34, 0x56]);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn slot(filename: &str, status: i32) -> UploadSlot {
        UploadSlot {
            filename: filename.to_string(),
            status,
            pre_signed_url: format!("http://s3.invalid/{filename}"),
        }
    }

    async fn logged_in(backend: &MockBackend) -> ApiClient {
        let client = ApiClient::new(&backend.base_url(), Arc::new(MemorySessionStore::new())).unwrap();
        client
            .login(&LoginRequest {
                member_login_id: fixtures::TEST_LOGIN_ID.to_string(),
                password: fixtures::TEST_PASSWORD.to_string(),
            })
            .await
            .unwrap();
        client
    }

    #[test]
    fn test_metadata_limit() {
        assert_eq!(build_metadata(&photos(10)).unwrap().len(), 10);
        assert!(matches!(build_metadata(&photos(11)), Err(ApiError::TooManyPhotos(11))));
        assert_eq!(build_metadata(&photos(1)).unwrap()[0].expected_size, 16);
    }

    #[test]
    fn test_match_slots_by_filename() {
        let photos = photos(2);
        let slots = vec![slot("frame1.jpg", 0), slot("frame0.jpg", 0)];
        let pairs = match_slots(&photos, &slots).unwrap();
        assert_eq!(pairs[0].1.filename, "frame1.jpg");
        assert_eq!(pairs[1].1.filename, "frame0.jpg");
    }

    #[test]
    fn test_refused_slot_fails_batch() {
        let photos = photos(2);
        let slots = vec![slot("frame0.jpg", 0), slot("frame1.jpg", 2)];
        let err = match_slots(&photos, &slots).unwrap_err();
        assert!(matches!(err, ApiError::Upload { filename, .. } if filename == "frame1.jpg"));
    }

    #[test]
    fn test_unknown_filename_fails() {
        let err = match_slots(&photos(1), &[slot("other.png", 0)]).unwrap_err();
        assert!(matches!(err, ApiError::Upload { .. }));
    }

    #[test]
    fn test_content_type_guess() {
        assert_eq!(content_type_for("A.JPG"), "image/jpeg");
        assert_eq!(content_type_for("b.png"), "image/png");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn test_jpeg_metadata_is_stripped() {
        let original = jpeg_with_exif();
        assert!(contains(&original, b"Exif"));

        let photo = Photo::new("comb.jpg", "image/jpeg", original.clone()).without_metadata();
        assert_eq!(photo.filename, "comb.jpg");
        assert_eq!(photo.content_type, "image/jpeg");
        assert!(!contains(&photo.bytes, b"Exif"));
        assert!(!contains(&photo.bytes, b"shot on hive 3"));
        assert!(contains(&photo.bytes, b"JFIF"));
        assert!(photo.bytes.starts_with(&[0xFF, 0xD8]));
        assert!(photo.bytes.ends_with(&[0x12, 0x34, 0x56, 0xFF, 0xD9]));
        assert!(photo.bytes.len() < original.len());
    }

    #[test]
    fn test_unparseable_photo_passes_through() {
        let photo = Photo::new("frame.jpg", "image/jpeg", vec![7; 16]);
        assert_eq!(photo.clone().without_metadata(), photo);

        let gif = Photo::new("bee.gif", "image/gif", b"GIF89a".to_vec());
        assert_eq!(gif.clone().without_metadata(), gif);
    }

    #[tokio::test]
    async fn test_photo_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comb.png");
        tokio::fs::write(&path, b"png-bytes").await.unwrap();

        let photo = Photo::from_path(&path).await.unwrap();
        assert_eq!(photo.filename, "comb.png");
        assert_eq!(photo.content_type, "image/png");
        assert_eq!(photo.metadata().expected_size, 9);
    }

    #[tokio::test]
    async fn test_diagnose_uploads_every_photo() {
        let backend = MockBackend::start().await.unwrap();
        let client = logged_in(&backend).await;
        let hive = backend.seed_hive("East", 800.0, 800.0);

        let slots = diagnose(&client, hive, &photos(3)).await.unwrap();
        assert_eq!(slots.len(), 3);

        let mut uploaded = backend.uploads();
        uploaded.sort();
        assert_eq!(uploaded, vec!["frame0.jpg", "frame1.jpg", "frame2.jpg"]);
    }

    #[tokio::test]
    async fn test_diagnose_uploads_stripped_bytes() {
        let backend = MockBackend::start().await.unwrap();
        let client = logged_in(&backend).await;
        let hive = backend.seed_hive("East", 800.0, 800.0);

        let photo = Photo::new("comb.jpg", "image/jpeg", jpeg_with_exif());
        diagnose(&client, hive, &[photo]).await.unwrap();

        let uploaded = backend.uploaded_bytes("comb.jpg").unwrap();
        assert!(!contains(&uploaded, b"Exif"));
        let announced = backend
            .requests()
            .into_iter()
            .find_map(|r| r.body.filter(|b| b["photos"].is_array()))
            .unwrap();
        assert_eq!(announced["photos"][0]["expectedSize"], uploaded.len() as u64);
    }

    #[tokio::test]
    async fn test_diagnose_fails_when_slot_refused() {
        let backend = MockBackend::start().await.unwrap();
        let client = logged_in(&backend).await;
        let hive = backend.seed_hive("East", 800.0, 800.0);
        backend.refuse_upload("frame1.jpg");

        let err = diagnose(&client, hive, &photos(2)).await.unwrap_err();
        assert!(matches!(err, ApiError::Upload { .. }));
        assert!(backend.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_diagnose_fails_when_put_fails() {
        let backend = MockBackend::start().await.unwrap();
        let client = logged_in(&backend).await;
        let hive = backend.seed_hive("East", 800.0, 800.0);
        backend.fail_put("frame0.jpg");

        let err = diagnose(&client, hive, &photos(2)).await.unwrap_err();
        assert!(matches!(err, ApiError::Upload { filename, .. } if filename == "frame0.jpg"));
    }
}
