//! Colored console diagnostics.
//!
//! Recoverable bus/port errors are warnings; halting conditions print an
//! error with a register snapshot before execution stops.

use ansi_term::Colour::{Green, Red, Yellow};

pub fn info(msg: &str) {
    println!("{} {}", Green.bold().paint("INFO"), msg);
}

pub fn warn(msg: &str) {
    eprintln!("{} {}", Yellow.bold().paint("WARN"), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", Red.bold().paint("ERROR"), msg);
}
