//! A process-wide pool of gzip compressors.
//!
//! Each pooled [`GzipCompressor`] owns a deflate state and the buffer it writes
//! into. Allocating a deflate state costs a few hundred kilobytes, so instead
//! of building one per payload we borrow one through [`CompressorPool::acquire`]
//! and hand it back, reset, when the returned guard is dropped.

use std::io::{self, Write};
use std::ops::{Deref, DerefMut};

use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::EncodeError;

/// Shared pool used by the free functions in [`crate::encode`].
pub static COMPRESSOR_POOL: Lazy<CompressorPool> = Lazy::new(CompressorPool::default);

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const GZIP_METHOD_DEFLATE: u8 = 8;
const GZIP_OS_UNKNOWN: u8 = 255;

/// A deflate encoder writing into its own buffer, framed as a gzip member.
pub struct GzipCompressor {
    level: Compression,
    encoder: DeflateEncoder<Vec<u8>>,
    crc: Crc,
    /// Set once a stream has been written; cleared when the compressor is released.
    used: bool,
}

impl GzipCompressor {
    pub fn new(level: Compression) -> Self {
        Self {
            level,
            encoder: DeflateEncoder::new(Vec::new(), level),
            crc: Crc::new(),
            used: false,
        }
    }

    /// Bytes written to the buffer so far.
    pub fn buffered(&self) -> &[u8] {
        self.encoder.get_ref()
    }

    /// Compress `payload` into a complete gzip stream and return a copy of it.
    ///
    /// The buffer is left holding the stream until the compressor is released,
    /// so the copy must be taken here. Each borrow compresses one payload; a second
    /// call before release fails with `InvalidInput`.
    pub fn compress(&mut self, payload: &[u8]) -> io::Result<Vec<u8>> {
        if self.used {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "gzip compressor already holds a stream, release it before reuse",
            ));
        }
        self.used = true;

        let header = self.header();
        self.encoder.get_mut().extend_from_slice(&header);

        if let Err(error) = self.encoder.write_all(payload) {
            if let Err(finish_error) = self.encoder.try_finish() {
                debug!("failed to finish gzip stream after write error: {}", finish_error);
            }
            return Err(error);
        }
        self.crc.update(payload);
        self.encoder.try_finish()?;

        let checksum = self.crc.sum();
        let size = self.crc.amount();
        let buffer = self.encoder.get_mut();
        buffer.extend_from_slice(&checksum.to_le_bytes());
        buffer.extend_from_slice(&size.to_le_bytes());

        Ok(buffer.clone())
    }

    /// Discard the buffered bytes and point a fresh deflate state at the emptied buffer.
    fn reset(&mut self) -> io::Result<()> {
        let mut buffer = std::mem::take(self.encoder.get_mut());
        buffer.clear();
        // Finishes whatever is left into the placeholder taken above, then swaps our buffer back in.
        self.encoder.reset(buffer)?;
        self.crc.reset();
        self.used = false;
        Ok(())
    }

    fn header(&self) -> [u8; 10] {
        let extra_flags = match self.level.level() {
            level if level >= Compression::best().level() => 2,
            level if level <= Compression::fast().level() => 4,
            _ => 0,
        };

        [
            GZIP_MAGIC[0],
            GZIP_MAGIC[1],
            GZIP_METHOD_DEFLATE,
            0, // flags
            0, // mtime
            0,
            0,
            0,
            extra_flags,
            GZIP_OS_UNKNOWN,
        ]
    }
}

/// An unbounded free-list of compressors sharing one compression level.
pub struct CompressorPool {
    level: Compression,
    idle: Mutex<Vec<GzipCompressor>>,
}

impl Default for CompressorPool {
    fn default() -> Self {
        Self::new(Compression::default())
    }
}

impl CompressorPool {
    pub fn new(level: Compression) -> Self {
        Self {
            level,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Borrow a compressor with an empty buffer, allocating one if the pool is empty.
    pub fn acquire(&self) -> PooledCompressor<'_> {
        let pooled = self.idle.lock().pop();
        let compressor = pooled.unwrap_or_else(|| {
            debug!(level = self.level.level(), "allocating new gzip compressor");
            GzipCompressor::new(self.level)
        });

        PooledCompressor {
            pool: self,
            compressor: Some(compressor),
        }
    }

    /// Reset `compressor` and make it available to the next `acquire`.
    ///
    /// A compressor whose deflate state cannot be reset is dropped instead.
    pub fn release(&self, mut compressor: GzipCompressor) {
        match compressor.reset() {
            Ok(()) => self.idle.lock().push(compressor),
            Err(error) => debug!("discarding gzip compressor that failed to reset: {}", error),
        }
    }

    /// Number of compressors currently waiting in the pool.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Gzip `payload` with a pooled compressor.
    pub fn compress(&self, payload: &str) -> Result<Vec<u8>, EncodeError> {
        let mut compressor = self.acquire();
        Ok(compressor.compress(payload.as_bytes())?)
    }
}

/// A compressor borrowed from a [`CompressorPool`], returned to it on drop.
pub struct PooledCompressor<'p> {
    pool: &'p CompressorPool,
    compressor: Option<GzipCompressor>,
}

impl Deref for PooledCompressor<'_> {
    type Target = GzipCompressor;

    fn deref(&self) -> &Self::Target {
        self.compressor
            .as_ref()
            .expect("compressor is only taken when the guard is dropped")
    }
}

impl DerefMut for PooledCompressor<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.compressor
            .as_mut()
            .expect("compressor is only taken when the guard is dropped")
    }
}

impl Drop for PooledCompressor<'_> {
    fn drop(&mut self) {
        if let Some(compressor) = self.compressor.take() {
            self.pool.release(compressor);
        }
    }
}
