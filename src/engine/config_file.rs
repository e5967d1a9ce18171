/// Line based reader for the engine's text config files.
///
/// Each line is split into whitespace separated tokens. Lines starting with `;` are comments and
/// empty lines are skipped.
pub struct ConfigFile<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    current: Option<ConfigLine<'a>>,
}

#[derive(Debug, PartialEq)]
pub struct ConfigLine<'a> {
    /// 1 based line number in the source text.
    pub line_number: usize,
    pub tokens: Vec<&'a str>,
}

impl<'a> ConfigLine<'a> {
    pub fn key(&self) -> &'a str {
        self.tokens[0]
    }

    /// Tokens following the key.
    pub fn values(&self) -> &[&'a str] {
        &self.tokens[1..]
    }
}

/// Splits a line into tokens. Quoted strings are treated as a single token (without quotes).
/// Non-whitespace sequences are considered tokens outside of strings.
fn split_line(line: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut in_string = false;
    let mut token_start: Option<usize> = None;

    for (i, ch) in line.char_indices() {
        match ch {
            '"' => {
                if in_string {
                    // End of quoted string
                    if let Some(start) = token_start {
                        result.push(&line[start..i]);
                        token_start = None;
                    }
                    in_string = false;
                } else {
                    // Start of quoted string (skip quote)
                    in_string = true;
                    token_start = Some(i + 1);
                }
            }

            ch if ch.is_whitespace() => {
                if !in_string {
                    if let Some(start) = token_start {
                        result.push(&line[start..i]);
                        token_start = None;
                    }
                }
            }

            _ => {
                if token_start.is_none() {
                    token_start = Some(i);
                }
            }
        }
    }

    // Handle final token
    if let Some(start) = token_start {
        result.push(&line[start..]);
    }

    result
}

impl<'a> ConfigFile<'a> {
    pub fn new(data: &'a str) -> Self {
        let mut s = Self {
            lines: data.lines().enumerate(),
            current: None,
        };

        s.advance();

        s
    }

    fn advance(&mut self) {
        loop {
            self.current = self.lines.next().map(|(index, line)| ConfigLine {
                line_number: index + 1,
                tokens: split_line(line),
            });
            if let Some(ref current) = self.current {
                if current.tokens.is_empty() || current.tokens[0].starts_with(';') {
                    continue;
                }
            }
            break;
        }
    }
}

impl<'a> Iterator for ConfigFile<'a> {
    type Item = ConfigLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take();
        if current.is_some() {
            self.advance();
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic() {
        assert_eq!(split_line("one"), vec!["one"]);
        assert_eq!(split_line("one two"), vec!["one", "two"]);
        assert_eq!(split_line("one two three"), vec!["one", "two", "three"]);
        assert_eq!(split_line("one    two"), vec!["one", "two"]);
        assert_eq!(split_line("one\t\ttwo"), vec!["one", "two"]);
        assert_eq!(split_line("one \"two three\""), vec!["one", "two three"]);
    }

    #[test]
    fn skips_comments_and_empty_lines() {
        let text = "; terrain settings\n\nscale_factor 2\n  ; indented comment\ndetail Med\n";
        let lines: Vec<_> = ConfigFile::new(text).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line_number, 3);
        assert_eq!(lines[0].key(), "scale_factor");
        assert_eq!(lines[0].values(), &["2"]);
        assert_eq!(lines[1].line_number, 5);
        assert_eq!(lines[1].key(), "detail");
    }

    #[test]
    fn yields_every_line_once() {
        let mut file = ConfigFile::new("a 1\nb 2");
        assert_eq!(file.next().map(|l| l.key()), Some("a"));
        assert_eq!(file.next().map(|l| l.key()), Some("b"));
        assert!(file.next().is_none());
        assert!(file.next().is_none());
    }
}
