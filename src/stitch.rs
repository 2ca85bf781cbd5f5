use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

/// Reads chunk files back to back as one sequential stream.
///
/// Each part yields at most its expected length, so a chunk file that grew past
/// its range can never shift the bytes of the chunks after it.
#[derive(Debug, Default)]
pub struct Stitched {
    parts: Vec<Option<File>>,
    remaining: Vec<u64>,
    current: usize,
}

impl Stitched {
    pub fn new(parts: Vec<(File, u64)>) -> Self {
        let (parts, remaining) = parts.into_iter().map(|(f, len)| (Some(f), len)).unzip();
        Self {
            parts,
            remaining,
            current: 0,
        }
    }

    /// A single part of unknown length, read to its end.
    pub fn single(file: File) -> Self {
        Self::new(vec![(file, u64::MAX)])
    }

    /// Hands back every file handle, including ones already read to the end.
    pub fn into_parts(self) -> Vec<Option<File>> {
        self.parts
    }

    #[cfg(test)]
    pub(crate) fn from_slots(parts: Vec<Option<File>>, remaining: Vec<u64>) -> Self {
        Self {
            parts,
            remaining,
            current: 0,
        }
    }
}

impl AsyncRead for Stitched {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        while this.current < this.parts.len() {
            let idx = this.current;
            let remaining = this.remaining[idx];
            let Some(file) = this.parts[idx].as_mut().filter(|_| remaining > 0) else {
                this.current += 1;
                continue;
            };
            if buf.remaining() == 0 {
                return Poll::Ready(Ok(()));
            }

            let max = usize::try_from(remaining)
                .unwrap_or(usize::MAX)
                .min(buf.remaining());
            let mut part_buf = ReadBuf::new(buf.initialize_unfilled_to(max));
            ready!(Pin::new(file).poll_read(cx, &mut part_buf))?;
            let n = part_buf.filled().len();

            if n == 0 {
                this.current += 1;
                continue;
            }
            buf.advance(n);
            this.remaining[idx] = remaining - n as u64;
            return Poll::Ready(Ok(()));
        }

        Poll::Ready(Ok(()))
    }
}
