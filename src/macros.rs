//! Colored console diagnostics, in the style of the teacher's own
//! `error!`/`info!` macros (see `faucon`'s `src/main.rs` and
//! `src/debugger/mod.rs`): a tag printed in bold color followed by a
//! formatted message. Built on `termcolor` rather than a logging framework,
//! since this driver has no long-running process to instrument -- every
//! invocation is a single command that either succeeds or reports one error.

#[macro_export]
macro_rules! note {
    ($tag:expr, $($arg:tt)*) => {{
        use std::io::Write;
        use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

        let mut out = StandardStream::stdout(ColorChoice::Auto);
        let _ = out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
        let _ = write!(out, "{} ", $tag);
        let _ = out.reset();
        let _ = writeln!(out, $($arg)*);
    }};
}

#[macro_export]
macro_rules! warn {
    ($tag:expr, $($arg:tt)*) => {{
        use std::io::Write;
        use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

        let mut out = StandardStream::stderr(ColorChoice::Auto);
        let _ = out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
        let _ = write!(out, "{} ", $tag);
        let _ = out.reset();
        let _ = writeln!(out, $($arg)*);
    }};
}

#[macro_export]
macro_rules! error {
    ($tag:expr, $($arg:tt)*) => {{
        use std::io::Write;
        use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

        let mut out = StandardStream::stderr(ColorChoice::Auto);
        let _ = out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
        let _ = write!(out, "{} ", $tag);
        let _ = out.reset();
        let _ = writeln!(out, $($arg)*);
    }};
}
