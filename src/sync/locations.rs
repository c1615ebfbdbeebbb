//! Paths used while downloading a song

use std::path::{Path, PathBuf};

use crate::library::Song;
use crate::song_txt::Headers;
use crate::utils::{is_name_maybe_with_suffix, resource_file_ending, sanitize_filename};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    folder: PathBuf,
    filename_stem: String,
    temp_dir: PathBuf,
}

impl Locations {
    /// Keep the folder of an existing download. A new song gets the wanted
    /// folder path, which is only claimed when the run commits.
    pub fn new(song: &Song, song_dir: &Path, headers: &Headers, temp_dir: &Path) -> Self {
        let filename_stem = sanitize_filename(&headers.artist_title());
        let folder = match &song.sync_meta {
            Some(record) => record.folder().to_path_buf(),
            None => song_dir.join(&filename_stem),
        };
        Self {
            folder,
            filename_stem,
            temp_dir: temp_dir.to_path_buf(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn set_folder(&mut self, folder: PathBuf) {
        self.folder = folder;
    }

    pub fn filename_stem(&self) -> &str {
        &self.filename_stem
    }

    /// Folder name is the stem, possibly with a ` (n)` suffix
    pub fn has_canonical_folder_name(&self) -> bool {
        self.folder
            .file_name()
            .is_some_and(|name| is_name_maybe_with_suffix(&name.to_string_lossy(), &self.filename_stem))
    }

    /// Path of `name` inside the song folder
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.folder.join(name)
    }

    /// Staging path of the stem with extension `ext`
    pub fn temp_path(&self, ext: &str) -> PathBuf {
        self.temp_dir.join(format!("{}.{}", self.filename_stem, ext))
    }

    /// Staging path of the stem without extension, as given to fetchers
    pub fn temp_stem(&self) -> PathBuf {
        self.temp_dir.join(&self.filename_stem)
    }

    /// Canonical name for a file, keeping its ending and image marker
    pub fn canonical_name(&self, existing_name: &str) -> String {
        format!("{}{}", self.filename_stem, resource_file_ending(existing_name))
    }
}
