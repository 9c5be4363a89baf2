//! Colored log output, only when logging to a terminal.
use crate::config::get_config;
use colored::{Color, Colorize};

/// Color text for the logs if stderr is a terminal, leave it alone otherwise.
pub trait MaybeColorize: AsRef<str> {
    fn green(&self) -> String {
        paint(self.as_ref(), Color::Green, get_config().general.tty)
    }

    fn red(&self) -> String {
        paint(self.as_ref(), Color::Red, get_config().general.tty)
    }

    fn purple(&self) -> String {
        paint(self.as_ref(), Color::Magenta, get_config().general.tty)
    }

    fn yellow(&self) -> String {
        paint(self.as_ref(), Color::Yellow, get_config().general.tty)
    }
}

impl<T: AsRef<str> + ?Sized> MaybeColorize for T {}

fn paint(text: &str, color: Color, tty: bool) -> String {
    if tty {
        text.color(color).to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_paint() {
        assert_eq!(paint("201", Color::Green, false), "201");

        colored::control::set_override(true);
        let painted = paint("500", Color::Red, true);
        assert!(painted.contains("500"));
        assert_ne!(painted, "500");
    }
}
