/*!
A software OpenFlow 1.0 switch.

The switch ports are UDP tunnels configured in an INI file,
see the `conf` module for its format.
The switch connects to one or more controllers and forwards the frames
between its ports according to the flow entries the controllers install.
To run it against a controller on the local machine:

```sh
$ ryu-manager ryu.app.simple_switch &
$ ofswitch -vv -c switch.ini tcp:127.0.0.1:6633
```
*/

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;
extern crate byteorder;
extern crate ini;
extern crate ipnetwork;
extern crate simple_logger;

#[cfg(unix)]
extern crate libc;
#[cfg(unix)]
extern crate log_panics;
#[cfg(unix)]
extern crate syslog;

mod action;
mod buffer;
mod conf;
mod flow_table;
mod net;
mod openflow;
mod packet;
mod switch;

use net::UdpNetwork;
use switch::{Switch, SwitchCore};

use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

const SIGNAL_POLL: Duration = Duration::from_millis(200);

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Locks a mutex, ignoring a panic of a previous holder
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(unix)]
extern "C" fn request_stop(_signal: libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_signal_handlers() {
    let handler = request_stop as extern "C" fn(libc::c_int) as libc::sighandler_t;
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
}

#[cfg(not(unix))]
fn install_signal_handlers() {}

/// Stops the switch once a termination signal arrived
fn watch_signals(core: Arc<SwitchCore>) {
    while core.is_running() {
        if STOP_REQUESTED.load(Ordering::SeqCst) {
            info!("Termination requested");
            core.stop();
            return;
        }
        thread::sleep(SIGNAL_POLL);
    }
}

fn logging_error<E: ::std::fmt::Display>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("error on logging initialization: {}", e))
}

/// Reads command line arguments and calls the corresponding functions.
fn handle_cli_args() -> io::Result<()> {
    #[cfg(unix)]
    let unix_opts = "-p, --pid [file] 'Daemonizes the process and writes a PID file'
        -s, --syslog      'Logs via syslog'
        ";
    #[cfg(not(unix))]
    let unix_opts = "";

    let usage = &format!(
        "{}-v...           'Repeat to set the level of verbosity'
        -c, --conf <ini>   'The INI configuration file'
        [controller]...    'Controllers to connect to, e.g. tcp:127.0.0.1:6633'",
        unix_opts
    );
    let matches = app_from_crate!().args_from_usage(usage).get_matches();

    let log_lvl = match matches.occurrences_of("v") {
        0 => log::Level::Error,
        1 => log::Level::Warn,
        2 => log::Level::Info,
        3 => log::Level::Debug,
        _ => log::Level::Trace,
    };

    #[cfg(unix)]
    {
        if matches.is_present("syslog") {
            let app_name = Some(crate_name!());
            syslog::init(syslog::Facility::LOG_USER, log_lvl.to_level_filter(), app_name)
                .map_err(logging_error)?;
            log_panics::init();
        } else {
            simple_logger::init_with_level(log_lvl).map_err(logging_error)?;
        }
    }
    #[cfg(not(unix))]
    simple_logger::init_with_level(log_lvl).map_err(logging_error)?;

    let conf_path = matches.value_of("conf").unwrap_or_default();
    let mut conf = conf::parse_file(conf_path)?;
    if let Some(uris) = matches.values_of("controller") {
        let uris: Vec<_> = uris.collect();
        conf.controllers = conf::parse_uris(&uris.join(","))?;
    }

    #[cfg(unix)]
    {
        if let Some(pid_path) = matches.value_of("pid") {
            let pid = unsafe { libc::fork() };
            if pid < 0 {
                return Err(io::Error::last_os_error());
            } else if pid > 0 {
                // exit the parent process
                exit(0);
            }
            let mut file = File::create(pid_path)?;
            write!(file, "{}", std::process::id())?;
        }
    }

    let network = UdpNetwork::open(&conf.ports)?;
    let mut switch = Switch::new(Arc::new(network), &conf.switch);
    for controller in &conf.controllers {
        if let Err(e) = switch.add_controller(&controller.socket) {
            error!("Connecting to controller {} failed: {}", controller.socket, e);
        }
    }

    install_signal_handlers();
    let core = switch.core();
    thread::spawn(move || watch_signals(core));

    switch.run();
    Ok(())
}

/// Entry function with top level error handling.
fn main() {
    if let Err(e) = handle_cli_args() {
        error!("{}", e);
        exit(1);
    }
}
