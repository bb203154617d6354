//! Text codec for the engine's object-dump format.
//!
//! The format is a comma-separated positional dump: an object type followed
//! by field values, one `;` terminator per object, `!` comments to end of
//! line. Field names are recovered from the schema table, from trailing
//! `!- Field Name` comments, or fall back to positional `Field_N`.
//!
//! Compact-schedule data fields carry an internal comma
//! (`Until: 07:00,16.0`); the parser re-joins an `Until:` token with the
//! value token that follows it so the object model sees one field per
//! until-block, matching the composition contract.

use anyhow::{Context, Result};
use besim_core::BesimError;
use std::fs;
use std::path::Path;

use crate::deck::Deck;
use crate::object::{DeckObject, FieldValue};
use crate::schema::field_names;

/// Parse a deck from text.
pub fn parse_deck(text: &str) -> Result<Deck> {
    let mut deck = Deck::new();
    for raw_object in split_objects(text)? {
        let object = build_object(raw_object)?;
        // Base decks are trusted for order; uniqueness is still enforced at
        // composition time through Deck::validate.
        deck.push_unchecked(object);
    }
    if deck.is_empty() {
        return Err(BesimError::DeckMalformed("deck contains no objects".into()).into());
    }
    Ok(deck)
}

/// Load a deck from a file.
pub fn load_deck(path: &Path) -> Result<Deck> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading deck '{}'", path.display()))?;
    parse_deck(&text).with_context(|| format!("parsing deck '{}'", path.display()))
}

/// Serialize a deck to the object-dump format.
pub fn write_deck(deck: &Deck) -> String {
    let mut out = String::new();
    for object in deck.objects() {
        out.push_str(object.object_type());
        out.push_str(",\n");
        let count = object.field_count();
        if count == 0 {
            // An object with no fields still needs its terminator.
            out.truncate(out.len() - 2);
            out.push_str(";\n\n");
            continue;
        }
        for (idx, (name, value)) in object.fields().iter().enumerate() {
            let terminator = if idx + 1 == count { ';' } else { ',' };
            let rendered = value.to_string();
            out.push_str("    ");
            out.push_str(&rendered);
            out.push(terminator);
            let pad = 24usize.saturating_sub(rendered.len() + 1).max(2);
            out.extend(std::iter::repeat(' ').take(pad));
            out.push_str("!- ");
            out.push_str(&name.replace('_', " "));
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Save a deck to a file.
pub fn save_deck(deck: &Deck, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating deck directory '{}'", parent.display()))?;
    }
    fs::write(path, write_deck(deck))
        .with_context(|| format!("writing deck '{}'", path.display()))?;
    Ok(())
}

/// A raw token with an optional trailing `!- name` comment.
struct RawField {
    token: String,
    comment_name: Option<String>,
}

/// Split the text into objects: each is the list of raw fields up to a `;`.
fn split_objects(text: &str) -> Result<Vec<Vec<RawField>>> {
    let mut objects = Vec::new();
    let mut current: Vec<RawField> = Vec::new();
    let mut token = String::new();

    for line in text.lines() {
        let (code, comment) = match line.find('!') {
            Some(idx) => (&line[..idx], Some(line[idx + 1..].trim())),
            None => (line, None),
        };
        let comment_name = comment
            .and_then(|c| c.strip_prefix('-'))
            .map(|c| c.trim().replace(' ', "_"))
            .filter(|c| !c.is_empty());
        let mut fields_on_line = 0usize;
        for ch in code.chars() {
            match ch {
                ',' => {
                    current.push(RawField {
                        token: std::mem::take(&mut token),
                        comment_name: None,
                    });
                    fields_on_line += 1;
                }
                ';' => {
                    current.push(RawField {
                        token: std::mem::take(&mut token),
                        comment_name: None,
                    });
                    fields_on_line += 1;
                    objects.push(std::mem::take(&mut current));
                }
                other => token.push(other),
            }
        }
        // A field-name comment names the last field completed on this line.
        if fields_on_line == 1 {
            if let Some(name) = comment_name {
                if let Some(last) = current
                    .last_mut()
                    .or_else(|| objects.last_mut().and_then(|fields| fields.last_mut()))
                {
                    last.comment_name = Some(name);
                }
            }
        }
    }
    if !current.is_empty() || !token.trim().is_empty() {
        return Err(BesimError::DeckMalformed(
            "unterminated object at end of deck (missing ';')".into(),
        )
        .into());
    }
    Ok(objects)
}

fn build_object(raw: Vec<RawField>) -> Result<DeckObject> {
    let mut fields = raw.into_iter();
    let type_field = fields
        .next()
        .ok_or_else(|| BesimError::DeckMalformed("object with no type token".into()))?;
    let object_type = type_field.token.trim().to_string();
    if object_type.is_empty() {
        return Err(BesimError::DeckMalformed("object with empty type token".into()).into());
    }
    let mut object = DeckObject::new(&object_type);
    let schema = field_names(&object_type);
    let is_compact_schedule = object_type.eq_ignore_ascii_case("SCHEDULE:COMPACT");

    let mut pending: Vec<RawField> = fields.collect();
    if is_compact_schedule {
        pending = merge_until_tokens(pending);
    }

    for (idx, field) in pending.into_iter().enumerate() {
        let name = schema
            .and_then(|names| names.get(idx))
            .map(|name| name.to_string())
            .or(field.comment_name)
            .unwrap_or_else(|| format!("Field_{}", idx + 1));
        object.push_field(name, FieldValue::parse_token(&field.token));
    }
    Ok(object)
}

/// Re-join `Until: HH:MM` tokens with their value token.
fn merge_until_tokens(fields: Vec<RawField>) -> Vec<RawField> {
    let mut merged: Vec<RawField> = Vec::with_capacity(fields.len());
    let mut iter = fields.into_iter().peekable();
    while let Some(field) = iter.next() {
        let trimmed = field.token.trim();
        if trimmed.to_ascii_lowercase().starts_with("until:") && !trimmed.contains(',') {
            if let Some(value) = iter.next() {
                merged.push(RawField {
                    token: format!("{},{}", trimmed, value.token.trim()),
                    comment_name: field.comment_name,
                });
                continue;
            }
        }
        merged.push(field);
    }
    merged
}
