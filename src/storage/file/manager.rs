use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use log::debug;
use parking_lot::Mutex;
use thiserror::Error;

use crate::storage::file::{BlockId, Page};

#[derive(Error, Debug)]
pub enum FileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),
}

pub type Result<T> = std::result::Result<T, FileError>;

/// Handles raw block-granular file access within one database directory.
///
/// Every table, index and the log live in their own flat file whose length
/// is always a whole number of blocks. Files are opened lazily and cached by
/// name; a single manager-wide mutex serializes all I/O, which also keeps
/// the read/write/append primitives atomic with respect to each other.
pub struct FileManager {
    db_dir: PathBuf,
    block_size: usize,
    is_new: bool,
    open_files: Mutex<HashMap<String, File>>,
}

impl FileManager {
    /// Open (or create) the database directory.
    ///
    /// If the directory did not exist it is created and the manager reports
    /// `is_new`. Leftover temporary files from a previous run (names starting
    /// with "temp") are removed either way.
    pub fn new(db_dir: impl Into<PathBuf>, block_size: usize) -> Result<Self> {
        let db_dir = db_dir.into();

        let is_new = !db_dir.exists();
        if is_new {
            fs::create_dir_all(&db_dir)?;
        } else if !db_dir.is_dir() {
            return Err(FileError::NotADirectory(db_dir));
        }

        // Remove temporary files left behind by a previous run.
        for entry in fs::read_dir(&db_dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with("temp") {
                debug!("removing temp file {:?}", entry.path());
                fs::remove_file(entry.path())?;
            }
        }

        Ok(Self {
            db_dir,
            block_size,
            is_new,
            open_files: Mutex::new(HashMap::new()),
        })
    }

    /// True if the database directory was created by this manager.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Block size this manager was configured with.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Read the contents of the specified block into the page.
    ///
    /// Reading past the current end of file is not an error: the bytes that
    /// could be read are stored and the rest of the page is left untouched.
    pub fn read(&self, blk: &BlockId, page: &mut Page) -> Result<()> {
        let mut files = self.open_files.lock();
        let file = Self::get_file(&self.db_dir, &mut files, blk.filename())?;

        let offset = blk.number() as u64 * self.block_size as u64;
        file.seek(SeekFrom::Start(offset))?;

        let buf = page.contents_mut();
        let mut pos = 0;
        while pos < buf.len() {
            let n = file.read(&mut buf[pos..])?;
            if n == 0 {
                break;
            }
            pos += n;
        }
        Ok(())
    }

    /// Write the contents of the page to the specified block.
    ///
    /// The write is synced to the device before returning, so success means
    /// the block is durable as far as the OS is concerned.
    pub fn write(&self, blk: &BlockId, page: &Page) -> Result<()> {
        let mut files = self.open_files.lock();
        let file = Self::get_file(&self.db_dir, &mut files, blk.filename())?;

        let offset = blk.number() as u64 * self.block_size as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(page.contents())?;
        file.sync_data()?;
        Ok(())
    }

    /// Extend the file by one zero-filled block and return its BlockId.
    pub fn append(&self, filename: &str) -> Result<BlockId> {
        let mut files = self.open_files.lock();
        let file = Self::get_file(&self.db_dir, &mut files, filename)?;

        let new_blknum = (file.metadata()?.len() / self.block_size as u64) as i32;
        let offset = new_blknum as u64 * self.block_size as u64;

        let zeros = vec![0u8; self.block_size];
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&zeros)?;
        file.sync_data()?;

        Ok(BlockId::new(filename, new_blknum))
    }

    /// Number of blocks in the specified file.
    pub fn length(&self, filename: &str) -> Result<i32> {
        let mut files = self.open_files.lock();
        let file = Self::get_file(&self.db_dir, &mut files, filename)?;
        Ok((file.metadata()?.len() / self.block_size as u64) as i32)
    }

    /// Close all cached file handles.
    pub fn close(&self) {
        self.open_files.lock().clear();
    }

    fn get_file<'a>(
        db_dir: &PathBuf,
        files: &'a mut HashMap<String, File>,
        filename: &str,
    ) -> Result<&'a mut File> {
        if !files.contains_key(filename) {
            let path = db_dir.join(filename);
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)?;
            files.insert(filename.to_string(), file);
        }
        Ok(files.get_mut(filename).unwrap())
    }
}
