//! Output file name templates.
//!
//! A template may contain:
//!
//! - `$(NAME)`: replaced by the environment variable `NAME`, or nothing
//! - `%s`: replaced by the run type
//! - up to two integer specifiers `%[width]d` or `%[width]x`, always zero
//!   padded; the first takes the run number and the second the split number

use crate::error::{EvioError, EvioResult};
use std::path::PathBuf;

/// Widest zero padding an integer specifier may ask for.
const MAX_WIDTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    RunType,
    Number { width: usize, hex: bool },
}

/// A parsed file name template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    pieces: Vec<Piece>,
}

impl NameTemplate {
    /// Parses a template, expanding environment variables immediately.
    ///
    /// # Errors
    ///
    /// Returns [`EvioError::BadArgument`] for more than two integer
    /// specifiers, a width above 32, any other `%` conversion,
    /// or an unclosed `$(`.
    pub fn parse(template: &str) -> EvioResult<Self> {
        let expanded = expand_env(template)?;
        let mut pieces = Vec::new();
        let mut text = String::new();
        let mut numbers = 0;
        let mut chars = expanded.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                text.push(c);
                continue;
            }
            let mut digits = String::new();
            while let Some(d) = chars.next_if(char::is_ascii_digit) {
                digits.push(d);
            }
            let piece = match chars.next() {
                Some('s') if digits.is_empty() => Piece::RunType,
                Some(conv @ ('d' | 'x')) => {
                    numbers += 1;
                    if numbers > 2 {
                        return Err(EvioError::bad_argument(format!(
                            "file name {template:?} has more than two integer specifiers"
                        )));
                    }
                    let width = if digits.is_empty() {
                        0
                    } else {
                        digits
                            .parse::<usize>()
                            .ok()
                            .filter(|w| *w <= MAX_WIDTH)
                            .ok_or_else(|| {
                                EvioError::bad_argument(format!(
                                    "file name {template:?} asks for width {digits}, \
                                     at most {MAX_WIDTH} allowed"
                                ))
                            })?
                    };
                    Piece::Number {
                        width,
                        hex: conv == 'x',
                    }
                }
                other => {
                    return Err(EvioError::bad_argument(format!(
                        "file name {template:?} has unsupported conversion %{digits}{}",
                        other.map(String::from).unwrap_or_default()
                    )));
                }
            };
            if !text.is_empty() {
                pieces.push(Piece::Text(std::mem::take(&mut text)));
            }
            pieces.push(piece);
        }
        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }
        Ok(Self { pieces })
    }

    /// Number of integer specifiers.
    #[must_use]
    pub fn specifiers(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| matches!(p, Piece::Number { .. }))
            .count()
    }

    /// Produces a file name.
    ///
    /// With `split` set, the split number goes into the second specifier,
    /// or is appended as `.N` when there is none. Without it, the second
    /// specifier is dropped.
    #[must_use]
    pub fn render(&self, run: u32, split: Option<u32>, run_type: Option<&str>) -> PathBuf {
        let mut name = String::new();
        let mut numbers = 0;
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => name.push_str(text),
                Piece::RunType => name.push_str(run_type.unwrap_or_default()),
                &Piece::Number { width, hex } => {
                    numbers += 1;
                    let value = match (numbers, split) {
                        (1, _) => run,
                        (_, Some(split)) => split,
                        (_, None) => continue,
                    };
                    let number = if hex {
                        format!("{value:0width$x}")
                    } else {
                        format!("{value:0width$}")
                    };
                    name.push_str(&number);
                }
            }
        }
        if let Some(split) = split {
            if numbers < 2 {
                name.push_str(&format!(".{split}"));
            }
        }
        PathBuf::from(name)
    }
}

fn expand_env(template: &str) -> EvioResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("$(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find(')') else {
            return Err(EvioError::bad_argument(format!(
                "file name {template:?} has an unclosed $("
            )));
        };
        if let Ok(value) = std::env::var(&after[..end]) {
            out.push_str(&value);
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(template: &str, run: u32, split: Option<u32>, run_type: Option<&str>) -> String {
        NameTemplate::parse(template)
            .unwrap()
            .render(run, split, run_type)
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn plain_names() {
        assert_eq!(render("data.evio", 1, None, None), "data.evio");
        assert_eq!(render("data.evio", 1, Some(0), None), "data.evio.0");
    }

    #[test]
    fn run_and_split_numbers() {
        assert_eq!(render("run_%3d.evio", 7, None, None), "run_007.evio");
        assert_eq!(render("run_%3d.evio", 7, Some(2), None), "run_007.evio.2");
        assert_eq!(render("run_%d_%2x.evio", 7, Some(26), None), "run_7_1a.evio");
        assert_eq!(render("run_%d_%2x.evio", 7, None, None), "run_7_.evio");
    }

    #[test]
    fn run_type_substitution() {
        assert_eq!(render("%s_%4d.dat", 12, None, Some("cosmic")), "cosmic_0012.dat");
        assert_eq!(render("%s_%4d.dat", 12, None, None), "_0012.dat");
    }

    #[test]
    fn environment_expansion() {
        std::env::set_var("EVIO_NAMING_TEST_DIR", "/data");
        assert_eq!(
            render("$(EVIO_NAMING_TEST_DIR)/x.evio", 1, None, None),
            "/data/x.evio"
        );
        assert_eq!(render("$(EVIO_NAMING_UNSET_VAR)x.evio", 1, None, None), "x.evio");
        assert!(NameTemplate::parse("$(OPEN").is_err());
    }

    #[test]
    fn invalid_specifiers() {
        assert!(NameTemplate::parse("a%db%dc%d").is_err());
        assert!(NameTemplate::parse("a%f").is_err());
        assert!(NameTemplate::parse("a%").is_err());
        assert_eq!(NameTemplate::parse("a%d%x").unwrap().specifiers(), 2);
    }

    #[test]
    fn width_is_capped() {
        assert_eq!(render("r%32d", 5, None, None).len(), 33);
        assert!(matches!(
            NameTemplate::parse("r%33d"),
            Err(EvioError::BadArgument { .. })
        ));
        assert!(matches!(
            NameTemplate::parse("r%999999999999999999999999d"),
            Err(EvioError::BadArgument { .. })
        ));
    }
}
