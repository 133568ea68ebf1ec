use std::{
    ffi::{OsStr, OsString},
    ops::Index,
    os::unix::ffi::OsStringExt,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("missing closing {0} quote")]
    UnterminatedQuote(Quote),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quote::Single => write!(f, "single"),
            Quote::Double => write!(f, "double"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Character {
    SingleQuote,
    DoubleQuote,
    Backslash,
    WhiteSpace,
    Other,
}

impl Character {
    fn map(b: u8) -> Self {
        match b {
            b'\'' => Self::SingleQuote,
            b'"' => Self::DoubleQuote,
            b'\\' => Self::Backslash,
            b if b.is_ascii_whitespace() => Self::WhiteSpace,
            _ => Self::Other,
        }
    }
}

/// The words of one input line, with quoting and escaping already resolved.
///
/// Words keep the raw bytes of the line, so names that are not valid UTF-8
/// reach the file system untouched. Owned by the read loop for a single
/// iteration; dropping it releases the tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tokens {
    words: Vec<OsString>,
}

impl Tokens {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&OsStr> {
        self.words.get(idx).map(OsString::as_os_str)
    }

    pub fn first(&self) -> Option<&OsStr> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&OsStr> {
        self.words.last().map(OsString::as_os_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OsStr> {
        self.words.iter().map(OsString::as_os_str)
    }
}

impl Index<usize> for Tokens {
    type Output = OsStr;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.words[idx]
    }
}

impl<S: Into<OsString>> FromIterator<S> for Tokens {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            words: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Splits a raw line into tokens.
///
/// Outside quotes whitespace separates words and a backslash makes the next
/// byte literal. Single quotes keep everything verbatim, double quotes only
/// let a backslash escape `"`, `\`, `$` and `` ` ``. Quoted and unquoted
/// pieces that touch form a single word.
///
/// Every special character is ASCII, so multi byte sequences pass through
/// unchanged whether they are UTF-8 or not.
pub fn tokenize(line: impl AsRef<[u8]>) -> Result<Tokens, Error> {
    let mut words = Vec::new();
    // `None` while between words, so `''` can still produce an empty word
    let mut current: Option<Vec<u8>> = None;
    let mut quote: Option<Quote> = None;

    let mut it = line.as_ref().iter().copied().peekable();

    while let Some(b) = it.next() {
        match (quote, Character::map(b)) {
            (Some(Quote::Single), Character::SingleQuote) => quote = None,
            (Some(Quote::Single), _) => current.get_or_insert_with(Vec::new).push(b),
            (Some(Quote::Double), Character::DoubleQuote) => quote = None,
            (Some(Quote::Double), Character::Backslash) => {
                let word = current.get_or_insert_with(Vec::new);
                match it.peek().copied() {
                    Some(next @ (b'"' | b'\\' | b'$' | b'`')) => {
                        word.push(next);
                        it.next();
                    }
                    _ => word.push(b'\\'),
                }
            }
            (Some(Quote::Double), _) => current.get_or_insert_with(Vec::new).push(b),
            (None, Character::SingleQuote) => {
                current.get_or_insert_with(Vec::new);
                quote = Some(Quote::Single);
            }
            (None, Character::DoubleQuote) => {
                current.get_or_insert_with(Vec::new);
                quote = Some(Quote::Double);
            }
            (None, Character::Backslash) => {
                let word = current.get_or_insert_with(Vec::new);
                if let Some(next) = it.next() {
                    word.push(next);
                }
            }
            (None, Character::WhiteSpace) => {
                if let Some(word) = current.take() {
                    words.push(OsString::from_vec(word));
                }
            }
            (None, Character::Other) => current.get_or_insert_with(Vec::new).push(b),
        }
    }

    if let Some(q) = quote {
        return Err(Error::UnterminatedQuote(q));
    }

    words.extend(current.map(OsString::from_vec));

    Ok(Tokens { words })
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    fn words(txt: &str) -> Vec<String> {
        tokenize(txt)
            .expect("line should tokenize")
            .iter()
            .map(|w| w.to_str().expect("test words are UTF-8").to_string())
            .collect()
    }

    #[test]
    fn simple() {
        assert_eq!(words("foo"), ["foo"]);
    }

    #[test]
    fn simple_multiple() {
        assert_eq!(words("foo XX"), ["foo", "XX"]);
    }

    #[test]
    fn tabs_and_trailing_newline() {
        assert_eq!(words("ls\t-l   /tmp\n"), ["ls", "-l", "/tmp"]);
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert!(tokenize("   \t ").unwrap().is_empty());
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn single_single_quote() {
        assert_eq!(words("'XX'"), ["XX"]);
    }

    #[test]
    fn multiple_single_quote() {
        assert_eq!(words("'AA    ''BB' 'CC'"), ["AA    BB", "CC"]);
    }

    #[test]
    fn single_quote_with_double() {
        assert_eq!(words("'\"AA\"'"), ["\"AA\""]);
    }

    #[test]
    fn double_quote() {
        assert_eq!(words("\"XX\""), ["XX"]);
    }

    #[test]
    fn multiple_double_quote() {
        assert_eq!(words("\"AA\"\"BB\" \"CC\""), ["AABB", "CC"]);
    }

    #[test]
    fn double_quote_with_single() {
        assert_eq!(words("\"'AA'\""), ["'AA'"]);
    }

    #[test]
    fn empty_quotes_make_an_empty_word() {
        assert_eq!(words("echo '' x"), ["echo", "", "x"]);
    }

    #[test]
    fn double_backslash() {
        assert_eq!(words("/tmp/file\\\\name"), ["/tmp/file\\name"]);
    }

    #[test]
    fn escaped_string_backslash() {
        assert_eq!(words("world\\ \\ \\ \\ \\ \\ script"), ["world      script"]);
    }

    #[test]
    fn escaped_string_backslash_beginning() {
        assert_eq!(words("\\ world"), [" world"]);
    }

    #[test]
    fn false_escaped_backslasch() {
        assert_eq!(words("\"before\\   after\""), ["before\\   after"]);
    }

    #[test]
    fn escaped_before_text() {
        assert_eq!(words(r#"\'\"world hello\"\'"#), [r#"'"world"#, r#"hello"'"#]);
    }

    #[test]
    fn backslasch_within_double_quotes() {
        assert_eq!(
            words(r#""shell\"insidequotes"example\""#),
            [r#"shell"insidequotesexample""#]
        );
    }

    #[test]
    fn non_ascii_words() {
        assert_eq!(words("écho 'héllo wörld'"), ["écho", "héllo wörld"]);
    }

    #[test]
    fn redirection_operators_stay_separate_words() {
        assert_eq!(words("ls > out.txt"), ["ls", ">", "out.txt"]);
    }

    #[test]
    fn unterminated_quotes() {
        assert_eq!(
            tokenize("echo 'abc"),
            Err(Error::UnterminatedQuote(Quote::Single))
        );
        assert_eq!(
            tokenize("echo \"abc"),
            Err(Error::UnterminatedQuote(Quote::Double))
        );
    }

    #[test]
    fn token_access() {
        let tokens = tokenize("cd /tmp").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(&tokens[1], "/tmp");
        assert_eq!(tokens.get(2), None);
        assert_eq!(tokens.last(), Some(OsStr::new("/tmp")));
    }

    #[test]
    fn invalid_utf8_bytes_are_kept() {
        use std::os::unix::ffi::OsStrExt as _;

        let tokens = tokenize(b"cat f\xffx 'a\xfe b'\n").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].as_bytes(), b"f\xffx");
        assert_eq!(tokens[2].as_bytes(), b"a\xfe b");
    }
}
