//! MSB-first bit packing over byte streams.
//!
//! Thin wrappers around `bitstream-io`'s big-endian reader and writer that
//! keep a running bit count and give the writer flush-on-release semantics:
//! a trailing partial byte is emitted with its unused low bits zeroed.

use std::io::{Read, Write};

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use crate::error::{ArchiveError, Result};

fn low_bits(value: u64, count: u32) -> u64 {
    if count >= 64 {
        value
    } else {
        value & ((1u64 << count) - 1)
    }
}

/// Bit sink. Dropping it pads and flushes the last partial byte; prefer
/// [`BitOutput::finish`] to observe errors from that final write.
pub struct BitOutput<W: Write> {
    inner: Option<BitWriter<W, BigEndian>>,
    bits_written: u64,
}

impl<W: Write> BitOutput<W> {
    pub fn new(sink: W) -> Self {
        Self {
            inner: Some(BitWriter::endian(sink, BigEndian)),
            bits_written: 0,
        }
    }

    /// Append the `count` least-significant bits of `value`, most significant first.
    pub fn put(&mut self, value: u64, count: u32) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if count > 64 {
            return Err(ArchiveError::InvalidArguments(format!(
                "cannot write {count} bits at once"
            )));
        }
        let writer = self
            .inner
            .as_mut()
            .ok_or_else(|| ArchiveError::InvalidArguments("bit stream already finished".into()))?;
        writer.write(count, low_bits(value, count))?;
        self.bits_written += u64::from(count);
        Ok(())
    }

    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Pad the final byte with zeros, flush, and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        let mut writer = self
            .inner
            .take()
            .ok_or_else(|| ArchiveError::InvalidArguments("bit stream already finished".into()))?;
        writer.byte_align()?;
        let mut sink = writer.into_writer();
        sink.flush()?;
        Ok(sink)
    }
}

impl<W: Write> Drop for BitOutput<W> {
    fn drop(&mut self) {
        if let Some(mut writer) = self.inner.take() {
            if writer.byte_align().is_ok() {
                let _ = writer.into_writer().flush();
            }
        }
    }
}

/// Bit source. Running past the end of the underlying bytes yields
/// [`ArchiveError::UnexpectedEndOfInput`].
pub struct BitInput<R: Read> {
    inner: BitReader<R, BigEndian>,
    bits_read: u64,
}

impl<R: Read> BitInput<R> {
    pub fn new(source: R) -> Self {
        Self {
            inner: BitReader::endian(source, BigEndian),
            bits_read: 0,
        }
    }

    /// Read `count` bits, assembling them MSB-first.
    pub fn get(&mut self, count: u32) -> Result<u64> {
        if count == 0 {
            return Ok(0);
        }
        if count > 64 {
            return Err(ArchiveError::InvalidArguments(format!(
                "cannot read {count} bits at once"
            )));
        }
        let value = self.inner.read::<u64>(count)?;
        self.bits_read += u64::from(count);
        Ok(value)
    }

    pub fn get_bit(&mut self) -> Result<bool> {
        let bit = self.inner.read_bit()?;
        self.bits_read += 1;
        Ok(bit)
    }

    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }
}
