use smallvec::SmallVec;
use tempora_id::TemporalId;

use crate::{Error, LocalDate, LocalDateTime, LocalMinute, LocalTime, Result};

// ----------------------------------------------------------------------------

/// A primary key whose external form is a single semicolon-delimited string.
///
/// Key element types are restricted to those with an unambiguous token form:
/// strings (non-empty, no `;`), booleans (`true`/`false`), integers, temporal
/// ids (24-char hex), the civil time scalars (their integer encodings), enum
/// member names, and embedded keys (token-expanded in declaration order).
/// Floating-point elements are not representable: [`KeyWriter`] simply has no
/// method for them.
pub trait Key: Send + Sync + 'static {
    /// Append this key's tokens in declaration order.
    fn write_tokens(&self, writer: &mut KeyWriter) -> Result<()>;

    /// Populate this key's elements from the reader, consuming one token per
    /// scalar element and recursing for embedded keys.
    fn read_tokens(&mut self, reader: &mut TokenReader<'_>) -> Result<()>;

    /// The semicolon-delimited string form.
    fn value(&self) -> Result<String> {
        let mut writer = KeyWriter::new();
        self.write_tokens(&mut writer)?;
        Ok(writer.finish())
    }

    /// Populate all elements from a semicolon-delimited string, requiring
    /// every token to be consumed.
    fn populate_from_string(&mut self, value: &str) -> Result<()> {
        let mut reader = TokenReader::new(value);
        self.read_tokens(&mut reader)?;
        reader.finish()
    }
}

/// Compile-time metadata tying a key type to its serialized name.
///
/// The record bound to a key is resolved through the registry, which builds
/// the reverse map from registered record types.
pub trait KeyMeta: Key + Default {
    const TYPE_NAME: &'static str;
}

// ----------------------------------------------------------------------------

/// Accumulates key tokens, enforcing the token grammar.
#[derive(Default)]
pub struct KeyWriter {
    tokens: SmallVec<[String; 4]>,
}

impl KeyWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(&mut self, element: &str) -> Result<()> {
        if element.is_empty() {
            return Err(Error::KeyFormat(
                "string key element is empty; empty elements are not permitted in a key".to_owned(),
            ));
        }
        if element.contains(';') {
            return Err(Error::KeyFormat(format!(
                "key element {element:?} includes the semicolon delimiter; \
                 this delimiter is reserved for separating key tokens"
            )));
        }
        self.tokens.push(element.to_owned());
        Ok(())
    }

    pub fn int(&mut self, element: i64) {
        self.tokens.push(element.to_string());
    }

    pub fn bool(&mut self, element: bool) {
        self.tokens.push(if element { "true" } else { "false" }.to_owned());
    }

    pub fn id(&mut self, element: TemporalId) {
        self.tokens.push(element.to_string());
    }

    pub fn date(&mut self, element: LocalDate) {
        self.int(element.to_iso_int());
    }

    pub fn time(&mut self, element: LocalTime) {
        self.int(element.to_iso_int());
    }

    pub fn minute(&mut self, element: LocalMinute) {
        self.int(element.to_iso_int());
    }

    pub fn date_time(&mut self, element: LocalDateTime) {
        self.int(element.to_iso_int());
    }

    /// An enum member name; the same grammar as a string token.
    pub fn enum_name(&mut self, element: &str) -> Result<()> {
        self.string(element)
    }

    /// Token-expand an embedded key in place.
    pub fn key(&mut self, element: &dyn Key) -> Result<()> {
        element.write_tokens(self)
    }

    fn finish(self) -> String {
        self.tokens.join(";")
    }
}

// ----------------------------------------------------------------------------

/// Walks the tokens of a semicolon-delimited key string.
pub struct TokenReader<'a> {
    value: &'a str,
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> TokenReader<'a> {
    pub fn new(value: &'a str) -> Self {
        Self {
            value,
            tokens: value.split(';').collect(),
            pos: 0,
        }
    }

    fn next(&mut self) -> Result<&'a str> {
        let token = *self.tokens.get(self.pos).ok_or_else(|| {
            Error::KeyFormat(format!(
                "key {:?} has {} tokens, more are required",
                self.value,
                self.tokens.len()
            ))
        })?;
        if token.is_empty() {
            return Err(Error::KeyFormat(format!(
                "key {:?} contains an empty token",
                self.value
            )));
        }
        self.pos += 1;
        Ok(token)
    }

    pub fn string(&mut self) -> Result<String> {
        self.next().map(str::to_owned)
    }

    pub fn int(&mut self) -> Result<i64> {
        let token = self.next()?;
        token.parse().map_err(|_| {
            Error::KeyFormat(format!("key token {token:?} is not a valid integer"))
        })
    }

    pub fn bool(&mut self) -> Result<bool> {
        match self.next()? {
            "true" => Ok(true),
            "false" => Ok(false),
            token => Err(Error::KeyFormat(format!(
                "key token {token:?} is not a valid boolean; expected true or false"
            ))),
        }
    }

    pub fn id(&mut self) -> Result<TemporalId> {
        let token = self.next()?;
        token.parse().map_err(|_| {
            Error::KeyFormat(format!("key token {token:?} is not a valid temporal id"))
        })
    }

    pub fn date(&mut self) -> Result<LocalDate> {
        LocalDate::from_iso_int(self.int()?)
    }

    pub fn time(&mut self) -> Result<LocalTime> {
        LocalTime::from_iso_int(self.int()?)
    }

    pub fn minute(&mut self) -> Result<LocalMinute> {
        LocalMinute::from_iso_int(self.int()?)
    }

    pub fn date_time(&mut self) -> Result<LocalDateTime> {
        LocalDateTime::from_iso_int(self.int()?)
    }

    /// Read an embedded key, consuming as many tokens as it declares.
    pub fn key<K: Key + Default>(&mut self) -> Result<K> {
        let mut key = K::default();
        key.read_tokens(self)?;
        Ok(key)
    }

    /// Require every token to have been consumed.
    fn finish(self) -> Result<()> {
        if self.pos != self.tokens.len() {
            return Err(Error::KeyFormat(format!(
                "key {:?} contains {} tokens while {} were consumed, \
                 including any embedded key elements",
                self.value,
                self.tokens.len(),
                self.pos
            )));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
