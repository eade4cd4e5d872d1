//! The four files of a ChessBase database, memory-mapped read-only.
//!
//! Offsets in the header records index into the other three maps; every
//! access is bounds-checked so a corrupt database degrades into per-game
//! errors instead of a crash.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use thiserror::Error;

pub mod games;
pub mod header;
pub mod player;
pub mod tournament;

use header::{CBH_RECORD_SIZE, GameHeader};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("record {0} lies outside the header file")]
    RecordOutOfBounds(usize),
}

pub struct Database {
    pub cbh: Mmap,
    pub cbg: Mmap,
    pub cbp: Mmap,
    pub cbt: Mmap,
}

impl Database {
    /// Map the four files sharing `base` (the path without extension).
    pub fn open(base: &Path) -> Result<Self, DatabaseError> {
        let map = |ext: &str| -> Result<Mmap, DatabaseError> {
            let path = base.with_extension(ext);
            let file = File::open(&path).map_err(|source| DatabaseError::Open {
                path: path.clone(),
                source,
            })?;
            // read-only map of an already-opened file
            unsafe { Mmap::map(&file) }.map_err(|source| DatabaseError::Open { path, source })
        };

        Ok(Self {
            cbh: map("cbh")?,
            cbg: map("cbg")?,
            cbp: map("cbp")?,
            cbt: map("cbt")?,
        })
    }

    /// Number of 46-byte records, the file header included.
    pub fn record_count(&self) -> usize {
        self.cbh.len() / CBH_RECORD_SIZE
    }

    pub fn header(&self, index: usize) -> Result<GameHeader<'_>, DatabaseError> {
        let start = index * CBH_RECORD_SIZE;
        self.cbh
            .get(start..start + CBH_RECORD_SIZE)
            .map(GameHeader::new)
            .ok_or(DatabaseError::RecordOutOfBounds(index))
    }

    /// The six magic bytes of record 0, when the file is long enough.
    pub fn magic(&self) -> Option<&[u8]> {
        self.cbh.get(0..6)
    }
}
