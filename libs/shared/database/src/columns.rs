use rusqlite::types::Type;

/// Decodes a TEXT column with `parse`, surfacing failures as rusqlite
/// conversion errors so row mappers can use `?` throughout.
pub fn parse_text_column<T, E, F>(index: usize, raw: &str, parse: F) -> rusqlite::Result<T>
where
    F: FnOnce(&str) -> Result<T, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    parse(raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}
