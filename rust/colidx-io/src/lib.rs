//! I/O abstractions:
//! - `ReadAt`: positional reader with the ability to fill a caller-supplied buffer from
//!   an arbitrary position of a file/blob.
//!
//! Provides a couple of simple implementations: memory-based and file-based.

use std::sync::Arc;

pub mod file;
pub mod memory;

pub use file::FileReader;

/// A trait representing a conceptual file or buffer that supports reading from arbitrary
/// positions.
///
/// Readers are shared between query threads, hence `Send + Sync`; all methods take
/// `&self`.
pub trait ReadAt: Send + Sync {
    /// Returns the size of the underlying object.
    fn size(&self) -> std::io::Result<u64>;

    /// Reads exactly `buf.len()` bytes starting at `pos`.
    ///
    /// **NOTE**: unlike [`std::io::Read::read`], a short read is an error: if the range
    /// `pos..pos + buf.len()` extends beyond the end of the object, the call fails with
    /// [`std::io::ErrorKind::UnexpectedEof`]. The content of `buf` is unspecified when
    /// an error is returned.
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> std::io::Result<()>;
}

impl<T> ReadAt for Arc<T>
where
    T: ReadAt + ?Sized,
{
    fn size(&self) -> std::io::Result<u64> {
        self.as_ref().size()
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
        self.as_ref().read_at(pos, buf)
    }
}

impl<T> ReadAt for Box<T>
where
    T: ReadAt + ?Sized,
{
    fn size(&self) -> std::io::Result<u64> {
        self.as_ref().size()
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
        self.as_ref().read_at(pos, buf)
    }
}

impl<T> ReadAt for &T
where
    T: ReadAt + ?Sized,
{
    fn size(&self) -> std::io::Result<u64> {
        (**self).size()
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
        (**self).read_at(pos, buf)
    }
}
