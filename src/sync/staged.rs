//! Per-resource state of a download run before commit

use std::io;
use std::path::{Path, PathBuf};

use crate::library::{ResourceFile, ResourceKind, SyncRecord};

/// A resource that is either kept from the song folder or freshly staged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedResource {
    /// File in the song folder that may be kept
    pub existing_path: Option<PathBuf>,
    /// Newly downloaded file in the temp dir
    pub staged_path: Option<PathBuf>,
    /// Identifier of the remote source
    pub resource: Option<String>,
}

impl StagedResource {
    /// The staged file if any, else the existing one
    pub fn path(&self) -> Option<&Path> {
        self.staged_path
            .as_deref()
            .or(self.existing_path.as_deref())
    }

    pub fn path_and_resource(&self) -> Option<(&Path, &str)> {
        Some((self.path()?, self.resource.as_deref()?))
    }

    /// Record entry for the committed file
    pub fn to_resource_file(&self) -> io::Result<Option<ResourceFile>> {
        self.path_and_resource()
            .map(|(path, resource)| ResourceFile::new(path, resource))
            .transpose()
    }

    /// Point at a freshly staged file
    pub fn stage(&mut self, path: PathBuf, resource: &str) {
        self.staged_path = Some(path);
        self.resource = Some(resource.to_string());
    }
}

/// One staged resource per kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedBundle {
    pub txt: StagedResource,
    pub audio: StagedResource,
    pub video: StagedResource,
    pub cover: StagedResource,
    pub background: StagedResource,
}

impl StagedBundle {
    /// Reuse the files of a previous download that were not touched since.
    /// The txt is always regenerated and never seeded.
    pub fn seed_from(record: Option<&SyncRecord>, folder: &Path) -> Self {
        let mut bundle = Self::default();
        let Some(record) = record else {
            return bundle;
        };
        for kind in ResourceKind::ALL {
            if kind == ResourceKind::Txt {
                continue;
            }
            if let Some(old) = record.resource(kind).filter(|old| old.is_in_sync(folder)) {
                let staged = bundle.get_mut(kind);
                staged.resource = Some(old.resource.clone());
                staged.existing_path = Some(folder.join(&old.fname));
            }
        }
        bundle
    }

    pub fn get(&self, kind: ResourceKind) -> &StagedResource {
        match kind {
            ResourceKind::Txt => &self.txt,
            ResourceKind::Audio => &self.audio,
            ResourceKind::Video => &self.video,
            ResourceKind::Cover => &self.cover,
            ResourceKind::Background => &self.background,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut StagedResource {
        match kind {
            ResourceKind::Txt => &mut self.txt,
            ResourceKind::Audio => &mut self.audio,
            ResourceKind::Video => &mut self.video,
            ResourceKind::Cover => &mut self.cover,
            ResourceKind::Background => &mut self.background,
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ResourceKind, &mut StagedResource)> {
        [
            (ResourceKind::Txt, &mut self.txt),
            (ResourceKind::Audio, &mut self.audio),
            (ResourceKind::Video, &mut self.video),
            (ResourceKind::Cover, &mut self.cover),
            (ResourceKind::Background, &mut self.background),
        ]
        .into_iter()
    }
}
