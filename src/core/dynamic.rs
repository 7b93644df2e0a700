use crate::error::Parsed;
use crate::menu::MenuDef;
use crate::menufile::parse_generated_menu;
use crate::util::SpawnEnv;

use winsys::Result;

use std::io::Read;
use std::os::unix::io::AsRawFd;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

use anyhow::anyhow;
use nix::errno::Errno;
use nix::poll::poll;
use nix::poll::PollFd;
use nix::poll::PollFlags;

const MAX_OUTPUT: usize = 64 * 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs menu generating commands. The child's standard output is read into
/// a bounded buffer; a child that outlives the timeout or writes past the
/// buffer is killed and whatever it wrote so far is used.
#[derive(Debug, Clone)]
pub struct MenuCommand {
    timeout: Duration,
    limit: usize,
}

impl Default for MenuCommand {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            limit: MAX_OUTPUT,
        }
    }
}

impl MenuCommand {
    pub fn new(
        timeout: Duration,
        limit: usize,
    ) -> Self {
        Self {
            timeout,
            limit,
        }
    }

    /// Runs `command` through the shell and parses its output as menu
    /// definitions.
    pub fn run(
        &self,
        command: &str,
        env: &SpawnEnv,
    ) -> Result<Parsed<MenuDef>> {
        let output = self.output(command, env)?;
        Ok(parse_generated_menu(command, &output))
    }

    pub fn output(
        &self,
        command: &str,
        env: &SpawnEnv,
    ) -> Result<String> {
        debug!("generating menu with \"{}\"", command);

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .env("DISPLAY", &env.display)
            .env("PATH", &env.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()?;

        let collected = self.collect(&mut child);

        match &collected {
            Ok((_, true)) => {
                warn!("menu command \"{}\" did not finish in time", command);
                drop(child.kill());
            },
            Ok((_, false)) => {},
            Err(_) => drop(child.kill()),
        }

        // the SIGCHLD reaper may have collected it already
        drop(child.wait());

        let (buffer, _) = collected?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Reads the child's output until end of file, the deadline, or the
    /// buffer limit; the flag tells whether reading was cut short.
    fn collect(
        &self,
        child: &mut Child,
    ) -> Result<(Vec<u8>, bool)> {
        let stdout = child
            .stdout
            .as_mut()
            .ok_or_else(|| anyhow!("menu command has no standard output"))?;

        let deadline = Instant::now() + self.timeout;
        let mut buffer = Vec::with_capacity(4096);
        let mut chunk = [0u8; 4096];

        loop {
            let now = Instant::now();

            if now >= deadline {
                return Ok((buffer, true));
            }

            let wait = poll_timeout(deadline - now);
            let mut fds = [PollFd::new(stdout.as_raw_fd(), PollFlags::POLLIN)];

            match poll(&mut fds, wait) {
                Ok(0) => return Ok((buffer, true)),
                Ok(_) => {},
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(anyhow!("unable to poll menu command: {}", err)),
            }

            let read = match stdout.read(&mut chunk) {
                Ok(0) => return Ok((buffer, false)),
                Ok(read) => read,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };

            let room = self.limit.saturating_sub(buffer.len());
            buffer.extend_from_slice(&chunk[..std::cmp::min(read, room)]);

            if read > room {
                warn!("menu command output exceeds {} bytes, truncating", self.limit);
                return Ok((buffer, true));
            }
        }
    }
}

/// Milliseconds to hand to `poll` for `remaining`, rounded up so the
/// deadline has passed when it returns.
fn poll_timeout(remaining: Duration) -> i32 {
    remaining.as_millis().min(i32::MAX as u128 - 1) as i32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> SpawnEnv {
        SpawnEnv::new(":0", 0, None)
    }

    #[test]
    fn output_is_parsed_as_a_menu() {
        let command = "printf '[start](gen)\\n[item](One){one}\\n[item](Two){two}\\n[end]\\n'";
        let parsed = MenuCommand::default().run(command, &env()).unwrap();

        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].name, "gen");
        assert_eq!(parsed.items[0].items.len(), 2);
    }

    #[test]
    fn poll_timeouts_saturate() {
        assert_eq!(poll_timeout(Duration::from_millis(0)), 1);
        assert_eq!(poll_timeout(Duration::from_millis(250)), 251);
        assert_eq!(poll_timeout(Duration::from_secs(30 * 24 * 60 * 60)), i32::MAX);
    }

    #[test]
    fn hung_children_are_cut_off() {
        let runner = MenuCommand::new(Duration::from_millis(100), MAX_OUTPUT);
        let started = Instant::now();

        let output = runner.output("echo partial; sleep 5", &env()).unwrap();

        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(output, "partial\n");
    }

    #[test]
    fn output_is_bounded() {
        let runner = MenuCommand::new(Duration::from_secs(2), 16);
        let output = runner.output("yes lanthorn", &env()).unwrap();

        assert_eq!(output.len(), 16);
    }
}
