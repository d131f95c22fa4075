//! Concurrent stdout/stderr relay for a piped child.
//!
//! Each stream is copied by its own thread while the caller blocks on the
//! child's exit. Byte order is preserved within a stream; there is no
//! ordering between the two streams.

use std::io::{self, Read, Write};
use std::process::{Child, ExitStatus};
use std::thread::{self, JoinHandle};

/// Relays the child's piped output to this process's stdout and stderr and
/// waits for it to exit.
///
/// # Errors
///
/// Returns an error if waiting fails or either copy loop fails.
pub fn relay_and_wait(child: Child) -> io::Result<ExitStatus> {
    relay_into(child, io::stdout(), io::stderr())
}

/// Like [`relay_and_wait`] with explicit destinations.
///
/// # Errors
///
/// Returns an error if waiting fails or either copy loop fails.
pub fn relay_into<O, E>(mut child: Child, out: O, err: E) -> io::Result<ExitStatus>
where
    O: Write + Send + 'static,
    E: Write + Send + 'static,
{
    let stdout = child.stdout.take().map(|source| pump(source, out));
    let stderr = child.stderr.take().map(|source| pump(source, err));

    let status = child.wait()?;

    for handle in [stdout, stderr].into_iter().flatten() {
        let copied = handle
            .join()
            .map_err(|_| io::Error::other("stdio relay thread panicked"))??;
        tracing::trace!(bytes = copied, "relay stream drained");
    }
    Ok(status)
}

fn pump<R, W>(mut source: R, mut sink: W) -> JoinHandle<io::Result<u64>>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    thread::spawn(move || {
        let copied = io::copy(&mut source, &mut sink)?;
        sink.flush()?;
        Ok(copied)
    })
}
