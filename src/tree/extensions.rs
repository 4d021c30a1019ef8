use compact_str::CompactString;

/// Case-insensitive suffix filter on file names.
///
/// This is a plain `ends_with` test, not extension parsing: `"mp4"` matches
/// both `clip.mp4` and `foo.notmp4`. An empty filter lets everything through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    suffixes: Vec<CompactString>,
}

impl ExtensionFilter {
    /// Parse user input such as `".mp4, .MKV,zip"`.
    /// Entries are trimmed and lowercased; blank entries are dropped.
    pub fn parse(input: &str) -> Self {
        Self::from_suffixes(input.split(','))
    }

    pub fn from_suffixes<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<CompactString> = Vec::new();
        for suffix in suffixes {
            let suffix = suffix.as_ref().trim().to_lowercase();
            if suffix.is_empty() || out.iter().any(|s| s.as_str() == suffix) {
                continue;
            }
            out.push(CompactString::new(&suffix));
        }
        Self { suffixes: out }
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.suffixes.iter().map(|s| s.as_str())
    }

    pub fn matches(&self, file_name: &str) -> bool {
        if self.suffixes.is_empty() {
            return true;
        }
        let lower = file_name.to_lowercase();
        self.suffixes.iter().any(|s| lower.ends_with(s.as_str()))
    }
}
