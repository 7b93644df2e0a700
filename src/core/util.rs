use winsys::geometry::Dim;

use std::env;
use std::os::raw::c_int;
use std::process::Command;
use std::process::Stdio;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use nix::sys::signal::sigaction;
use nix::sys::signal::SaFlags;
use nix::sys::signal::SigAction;
use nix::sys::signal::SigHandler;
use nix::sys::signal::SigSet;
use nix::sys::signal::Signal;
use nix::sys::wait::waitpid;
use nix::sys::wait::WaitPidFlag;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

/// The environment every launched child inherits from its screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnEnv {
    pub display: String,
    pub path: String,
}

impl SpawnEnv {
    /// Builds the child environment for a screen: `DISPLAY` names the
    /// screen explicitly and `script_dir` is searched before `$PATH`.
    pub fn new(
        display: &str,
        screen: usize,
        script_dir: Option<&str>,
    ) -> Self {
        let host = display.rsplitn(2, ':').nth(1).unwrap_or("");
        let number = display
            .rsplitn(2, ':')
            .next()
            .and_then(|rest| rest.split('.').next())
            .unwrap_or("0");

        let inherited = env::var("PATH").unwrap_or_default();
        let path = match script_dir {
            Some(dir) if !dir.is_empty() => {
                if inherited.is_empty() {
                    Util::expand_tilde(dir)
                } else {
                    format!("{}:{}", Util::expand_tilde(dir), inherited)
                }
            },
            _ => inherited,
        };

        Self {
            display: format!("{}:{}.{}", host, number, screen),
            path,
        }
    }
}

static TERMINATED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_terminate(_: c_int) {
    TERMINATED.store(true, Ordering::SeqCst);
}

// only here to interrupt the event wait
extern "C" fn on_child(_: c_int) {}

pub struct Util;

impl Util {
    pub fn spawn_shell(
        cmd: &str,
        env: &SpawnEnv,
    ) {
        debug!("spawning \"{}\" on {}", cmd, env.display);

        let spawned = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .env("DISPLAY", &env.display)
            .env("PATH", &env.path)
            .stdin(Stdio::null())
            .spawn();

        if let Err(err) = spawned {
            warn!("unable to spawn \"{}\": {}", cmd, err);
        }
    }

    /// Turns SIGTERM, SIGINT and SIGHUP into a flag the event loop checks,
    /// and lets SIGCHLD cut the event wait short so children are reaped.
    pub fn install_signal_handlers() -> nix::Result<()> {
        let terminate = SigAction::new(
            SigHandler::Handler(on_terminate),
            SaFlags::empty(),
            SigSet::empty(),
        );

        let child = SigAction::new(
            SigHandler::Handler(on_child),
            SaFlags::SA_NOCLDSTOP,
            SigSet::empty(),
        );

        unsafe {
            for &signal in &[Signal::SIGTERM, Signal::SIGINT, Signal::SIGHUP] {
                sigaction(signal, &terminate)?;
            }

            sigaction(Signal::SIGCHLD, &child)?;
        }

        Ok(())
    }

    #[inline]
    pub fn terminated() -> bool {
        TERMINATED.load(Ordering::SeqCst)
    }

    /// Collects every exited child without blocking.
    pub fn reap_children() {
        while let Ok(status) = waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            match status {
                WaitStatus::StillAlive => break,
                status => trace!("reaped child: {:?}", status),
            }
        }
    }

    pub fn expand_tilde(path: &str) -> String {
        match path.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => {
                format!("{}{}", env::var("HOME").unwrap_or_default(), rest)
            },
            _ => path.to_owned(),
        }
    }

    /// Replaces the `W`/`w` and `H`/`h` tokens of a parameter with the
    /// screen width and height.
    pub fn substitute_dim(
        param: &str,
        dim: Dim,
    ) -> String {
        let mut substituted = String::with_capacity(param.len() + 8);

        for c in param.chars() {
            match c {
                'W' | 'w' => substituted.push_str(&dim.w.to_string()),
                'H' | 'h' => substituted.push_str(&dim.h.to_string()),
                c => substituted.push(c),
            }
        }

        substituted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_specific_display() {
        let env = SpawnEnv::new(":0", 1, None);
        assert_eq!(env.display, ":0.1");

        let env = SpawnEnv::new("remote:2.0", 0, None);
        assert_eq!(env.display, "remote:2.0");
    }

    #[test]
    fn script_dir_is_searched_first() {
        let env = SpawnEnv::new(":0", 0, Some("/opt/scripts"));
        assert!(env.path.starts_with("/opt/scripts"));
    }

    #[test]
    fn width_and_height_substitution() {
        let dim = Dim::new(1280, 1024);

        assert_eq!(Util::substitute_dim("W", dim), "1280");
        assert_eq!(Util::substitute_dim("-w+0", dim), "-1280+0");
        assert_eq!(Util::substitute_dim("Wx100+0+h", dim), "1280x100+0+1024");
    }

    #[test]
    fn tilde_expansion() {
        let home = env::var("HOME").unwrap_or_default();

        assert_eq!(Util::expand_tilde("~/menu"), format!("{}/menu", home));
        assert_eq!(Util::expand_tilde("/etc/menu"), "/etc/menu");
        assert_eq!(Util::expand_tilde("~user/menu"), "~user/menu");
    }
}
