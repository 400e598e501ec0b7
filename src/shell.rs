//! Subprocess filter for `shell` directives.
//!
//! The body of the directive becomes the command's stdin and its combined
//! stdout/stderr becomes the replacement text.

use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use tracing::{debug, warn};

/// Runs `command` with `input` on stdin and returns everything it wrote to
/// stdout and stderr, in the order it was written.
///
/// The child runs in the current working directory. It is always waited on
/// before this returns; if feeding or draining it fails it is killed first.
/// A non-zero exit status is not an error.
///
/// # Errors
///
/// Returns an `io::Error` if the command is empty, cannot be spawned, or a
/// pipe fails.
pub fn run(command: &[String], input: &str) -> io::Result<String> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

    let (mut output_reader, output_writer) = io::pipe()?;
    let mut child = {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(output_writer.try_clone()?)
            .stderr(output_writer);
        cmd.spawn()?
        // `cmd` drops here, closing our copies of the write end so the
        // reader sees EOF once the child exits.
    };
    debug!(program = %program, pid = child.id(), "spawned shell directive");

    let communicated = communicate(&mut child, &mut output_reader, input.as_bytes());
    if communicated.is_err() {
        kill(&mut child);
    }
    let status = child.wait()?;
    let output = communicated?;

    if status.success() {
        debug!(program = %program, bytes = output.len(), "shell directive finished");
    } else {
        warn!(program = %program, %status, "shell directive exited unsuccessfully; using its output anyway");
    }

    Ok(String::from_utf8_lossy(&output).into_owned())
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(pid = child.id(), error = %e, "could not kill shell directive");
    }
}

/// Feeds stdin on a scoped thread while draining `output`, so a child that
/// writes a lot before reading cannot deadlock us. If draining fails the
/// child is killed before the feeder is joined.
fn communicate(
    child: &mut Child,
    output: &mut impl Read,
    input: &[u8],
) -> io::Result<Vec<u8>> {
    let stdin = child.stdin.take();

    thread::scope(|scope| {
        let feeder = scope.spawn(move || -> io::Result<()> {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(input) {
                // the child is allowed to ignore its input
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
            // stdin drops here, closing the child's input
        });

        let mut collected = Vec::new();
        let read = output.read_to_end(&mut collected);
        if let Err(e) = &read {
            debug!(error = %e, "reading shell directive output failed");
            // the feeder may be blocked on a child that never reads stdin
            kill(child);
        }
        let fed = feeder
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stdin writer thread panicked")));

        read?;
        fed?;
        Ok(collected)
    })
}
