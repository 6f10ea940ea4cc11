use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassLabels {
    names: BTreeMap<usize, String>,
}

impl ClassLabels {
    /// One class name per line; blank lines are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read labels file {:?}: {}", path, e))
        })?;
        Ok(Self::from_lines(&content))
    }

    pub fn from_lines(content: &str) -> Self {
        let names = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .enumerate()
            .collect();
        Self { names }
    }

    /// Parses the `names` entry Ultralytics writes into exported ONNX metadata,
    /// e.g. `{0: 'button', 1: "user's icon"}`.
    pub fn from_metadata(value: &str) -> Result<Self> {
        let mut parser = DictParser::new(value);
        let names = parser.parse().map_err(|msg| {
            Error::ModelLoad(format!("Malformed class names metadata: {}", msg))
        })?;
        Ok(Self { names })
    }

    pub fn label(&self, class_id: usize) -> String {
        self.names
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

struct DictParser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> DictParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn parse(&mut self) -> std::result::Result<BTreeMap<usize, String>, String> {
        let mut names = BTreeMap::new();
        self.skip_ws();
        self.expect('{')?;
        loop {
            self.skip_ws();
            if self.chars.peek() == Some(&'}') {
                self.chars.next();
                break;
            }
            let key = self.key()?;
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = self.quoted()?;
            names.insert(key, value);
            self.skip_ws();
            match self.chars.next() {
                Some(',') => continue,
                Some('}') => break,
                other => return Err(format!("expected ',' or '}}', found {:?}", other)),
            }
        }
        self.skip_ws();
        if let Some(c) = self.chars.next() {
            return Err(format!("trailing character {:?}", c));
        }
        Ok(names)
    }

    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn expect(&mut self, expected: char) -> std::result::Result<(), String> {
        match self.chars.next() {
            Some(c) if c == expected => Ok(()),
            other => Err(format!("expected {:?}, found {:?}", expected, other)),
        }
    }

    fn key(&mut self) -> std::result::Result<usize, String> {
        let mut digits = String::new();
        while let Some(c) = self.chars.peek().copied().filter(|c| c.is_ascii_digit()) {
            digits.push(c);
            self.chars.next();
        }
        digits
            .parse()
            .map_err(|_| format!("expected class index, found {:?}", self.chars.peek()))
    }

    fn quoted(&mut self) -> std::result::Result<String, String> {
        let quote = match self.chars.next() {
            Some(q @ ('\'' | '"')) => q,
            other => return Err(format!("expected quoted name, found {:?}", other)),
        };
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some('\\') => match self.chars.next() {
                    Some(c) => value.push(c),
                    None => return Err("unterminated escape".to_string()),
                },
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
                None => return Err("unterminated string".to_string()),
            }
        }
    }
}
