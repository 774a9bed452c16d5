use crate::{Document, Result, TYPE_FIELD};

/// A structured value with named fields and no identity of its own.
///
/// Data values appear as nested documents inside records; the nested document
/// carries the value's type name so readers can tell what they are holding.
pub trait Data: Send + Sync + 'static {
    /// The serialized type name, stored in the `_t` field.
    fn type_name(&self) -> &'static str;

    /// Write the declared fields, Pascal-cased, into `doc`.
    ///
    /// Fields holding no value are omitted rather than written as nulls.
    fn write_fields(&self, doc: &mut Document) -> Result<()>;

    /// The nested-document form: `_t` plus the declared fields.
    fn to_document(&self) -> Result<Document> {
        let mut doc = Document::new();
        doc.set(TYPE_FIELD, self.type_name());
        self.write_fields(&mut doc)?;
        Ok(doc)
    }
}
