use super::preprocessing::{flatten_alpha, resize_exact};
use super::template_matcher::{prepare_channels, PreparedTemplate};
use crate::error::{ReaderError, Result};
use image::{DynamicImage, ImageReader, RgbImage};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// One canonical portrait, ready for correlation
#[derive(Debug, Clone)]
pub struct Reference {
    pub image: RgbImage,
    channels: [PreparedTemplate; 3],
}

impl Reference {
    fn new(image: RgbImage) -> Self {
        let channels = prepare_channels(&image);
        Self { image, channels }
    }

    pub fn channels(&self) -> &[PreparedTemplate; 3] {
        &self.channels
    }
}

/// Labelled reference portraits, iterated in identifier order
#[derive(Debug, Clone, Default)]
pub struct ReferenceLibrary {
    entries: BTreeMap<String, Reference>,
}

impl ReferenceLibrary {
    /// Build from `(identifier, image)` pairs, normalising every image to
    /// a `size`×`size` opaque RGB portrait
    pub fn from_images<I>(images: I, size: u32) -> Result<Self>
    where
        I: IntoIterator<Item = (String, DynamicImage)>,
    {
        let mut entries = BTreeMap::new();
        for (id, image) in images {
            if entries.contains_key(&id) {
                return Err(ReaderError::DuplicateReference(id));
            }
            let rgb = resize_exact(&flatten_alpha(&image), size, size);
            entries.insert(id, Reference::new(rgb));
        }
        Ok(Self { entries })
    }

    /// Load every decodable image in `dir`, keyed by file stem
    pub fn load<P: AsRef<Path>>(dir: P, size: u32) -> Result<Self> {
        let dir = dir.as_ref();
        let mut images = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let decoded = ImageReader::open(&path)
                .and_then(|reader| reader.with_guessed_format())
                .map_err(ReaderError::from)
                .and_then(|reader| reader.decode().map_err(ReaderError::from));

            match decoded {
                Ok(image) => images.push((id.to_string(), image)),
                Err(e) => warn!("Skipping reference {:?}: {}", path, e),
            }
        }

        let library = Self::from_images(images, size)?;
        if library.is_empty() {
            return Err(ReaderError::EmptyReferenceLibrary);
        }

        info!("Loaded {} reference portraits from {:?}", library.len(), dir);
        debug!("Reference identifiers: {:?}", library.ids().collect::<Vec<_>>());
        Ok(library)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Reference> {
        self.entries.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Reference)> {
        self.entries.iter().map(|(id, r)| (id.as_str(), r))
    }
}
