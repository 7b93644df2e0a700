#![deny(clippy::all)]
#![allow(dead_code)]

#[macro_use]
extern crate log;

#[macro_use]
extern crate winsys;

use simplelog::LevelFilter;
use simplelog::SimpleLogger;

use winsys::connection::Connection;
use winsys::xdata::xconnection::XConnection;
pub use winsys::Result;

use std::env;
use std::ffi::CString;
use std::os::unix::io::AsRawFd;

use anyhow::anyhow;
use clap::ArgAction;
use clap::Parser;
use nix::unistd::execvp;
use x11rb::connection::Connection as _;

#[macro_use]
mod defaults;

mod action;
mod actionfile;
mod binding;
mod change;
mod client;
mod config;
mod decoration;
mod desktop;
mod dock;
mod dynamic;
mod error;
mod manager;
mod matcher;
mod menu;
mod menufile;
#[cfg(test)]
mod mock;
mod model;
mod pixcache;
mod placement;
mod recency;
mod stack;
mod style;
mod timer;
mod util;

use actionfile::ActionTables;
use config::Config;
use config::ResourceDb;
use manager::WindowManager;
use menu::MenuDef;
use menufile::load_menus;
use menufile::parse_menu_text;
use model::Request;
use model::Session;
use style::Style;
use util::SpawnEnv;
use util::Util;

#[derive(Parser, Debug)]
#[command(name = "lanthorn", version, about = "A stacking window manager for X")]
struct Args {
    /// The display to manage, instead of $DISPLAY
    #[arg(short, long)]
    display: Option<String>,

    /// The rc file to read, instead of ~/.lanthornrc
    #[arg(short, long)]
    rcfile: Option<String>,

    /// Raise the log level; repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

pub fn main() -> Result<()> {
    let args = Args::parse();

    SimpleLogger::init(log_level(args.verbose), simplelog::Config::default())?;

    let display = args
        .display
        .clone()
        .or_else(|| env::var("DISPLAY").ok())
        .ok_or_else(|| anyhow!("no display given and $DISPLAY is not set"))?;

    let rcfile = args.rcfile.as_deref().unwrap_or(defaults::RC_FILE);
    let db = match ResourceDb::load(rcfile) {
        Some(db) => db,
        None => {
            if args.rcfile.is_some() {
                warn!("unable to read rc file {}, using defaults", rcfile);
            }

            ResourceDb::default()
        },
    };

    let config = Config::new(db);

    let (conn, _) = x11rb::connect(Some(&display))?;
    let numbers: Vec<usize> = (0..conn.setup().roots.len())
        .filter(|&number| config.manages_screen(number))
        .collect();

    if numbers.is_empty() {
        return Err(anyhow!("the screen mask excludes every screen"));
    }

    let xconn = XConnection::new(&conn, conn.stream().as_raw_fd(), &numbers)?;
    let keys = xconn.keymap();

    let mut sessions = Vec::with_capacity(numbers.len());
    for (index, screen) in xconn.screens().into_iter().enumerate() {
        let number = screen.number();
        let screen_config = config.screen(number);
        let dim = screen.full_region().dim;

        let style = if screen_config.style_file.is_empty() {
            Style::default()
        } else {
            match ResourceDb::load(&screen_config.style_file) {
                Some(db) => Style::from_db(&db),
                None => {
                    warn!("unable to read style file {}", screen_config.style_file);
                    Style::default()
                },
            }
        };

        let tables = if screen_config.action_file.is_empty() {
            ActionTables::parse("<builtin actions>", defaults::ACTIONS, &keys, dim)
        } else {
            ActionTables::load(&screen_config.action_file, &keys, dim)?
        };

        let menus = load_menu_defs(&screen_config.menu_file);
        let env = SpawnEnv::new(&display, number, config.script_dir.as_deref());

        sessions.push(Session::new(
            &xconn,
            index,
            screen,
            screen_config,
            style,
            tables,
            menus,
            env,
            keys.clone(),
        )?);
    }

    Util::install_signal_handlers()?;

    let mut manager = WindowManager::new(&xconn, sessions);
    manager.init();

    match manager.run() {
        Ok(Request::Exit) => Ok(()),
        Ok(Request::Restart(command)) => {
            drop(manager);
            restart(command)
        },
        Err(err) => {
            error!("{}", err);
            manager.teardown();
            Err(err)
        },
    }
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 if cfg!(debug_assertions) => LevelFilter::Debug,
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn load_menu_defs(path: &str) -> Vec<MenuDef> {
    if path.is_empty() {
        return parse_menu_text("<builtin menu>", defaults::MENU).report();
    }

    match load_menus(path) {
        Ok(parsed) => parsed.report(),
        Err(err) => {
            warn!("{}", err);
            Vec::new()
        },
    }
}

/// Replaces the process with `command` run through the shell, or with a
/// fresh copy of itself.
fn restart(command: Option<String>) -> Result<()> {
    let argv: Vec<String> = match command {
        Some(command) => vec!["/bin/sh".to_owned(), "-c".to_owned(), command],
        None => env::args().collect(),
    };

    info!("restarting as {:?}", argv);

    let argv = argv
        .into_iter()
        .map(CString::new)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let program = argv.first().ok_or_else(|| anyhow!("empty restart command"))?;
    execvp(program, &argv)?;

    Ok(())
}
