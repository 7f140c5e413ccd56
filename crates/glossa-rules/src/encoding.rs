//! `encoding`: the file must be plain UTF-8 without a byte order mark.

use glossa_engine::{Recipe, RecipeRule};
use glossa_types::{Artifact, Context, FixOutcome, FixPatch, Result, Status, ValidationOutcome};

pub const NAME: &str = "encoding";
pub const PRIORITY: i32 = 10;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detected {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    /// Not UTF-8; first invalid byte offset.
    Unknown(usize),
}

fn sniff(data: &[u8]) -> Detected {
    if data.starts_with(UTF8_BOM) {
        return Detected::Utf8Bom;
    }
    if data.starts_with(UTF16_LE_BOM) {
        return Detected::Utf16Le;
    }
    if data.starts_with(UTF16_BE_BOM) {
        return Detected::Utf16Be;
    }
    match std::str::from_utf8(data) {
        Ok(_) => Detected::Utf8,
        Err(err) => Detected::Unknown(err.valid_up_to()),
    }
}

fn decode_utf16(body: &[u8], little_endian: bool) -> Option<String> {
    if body.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            let bytes = [pair[0], pair[1]];
            if little_endian {
                u16::from_le_bytes(bytes)
            } else {
                u16::from_be_bytes(bytes)
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}

fn validate(_ctx: &Context, artifact: &Artifact) -> ValidationOutcome {
    match sniff(artifact.data()) {
        Detected::Utf8 => ValidationOutcome::pass("UTF-8"),
        Detected::Utf8Bom => ValidationOutcome::fail("UTF-8 with byte order mark"),
        Detected::Utf16Le => ValidationOutcome::fail("UTF-16LE; expected UTF-8"),
        Detected::Utf16Be => ValidationOutcome::fail("UTF-16BE; expected UTF-8"),
        Detected::Unknown(offset) => {
            ValidationOutcome::fail(format!("not valid UTF-8 (invalid byte at offset {offset})"))
        }
    }
}

fn fix(_ctx: &Context, artifact: &Artifact) -> Result<FixOutcome> {
    let data = artifact.data();
    let outcome = match sniff(data) {
        Detected::Utf8 => FixOutcome::unchanged("already UTF-8"),
        Detected::Utf8Bom => FixOutcome::Applied(
            FixPatch::new()
                .with_data(data[UTF8_BOM.len()..].to_vec())
                .with_note("removed UTF-8 byte order mark"),
        ),
        detected @ (Detected::Utf16Le | Detected::Utf16Be) => {
            let little_endian = detected == Detected::Utf16Le;
            let body = &data[UTF16_LE_BOM.len()..];
            match decode_utf16(body, little_endian) {
                Some(text) => FixOutcome::Applied(
                    FixPatch::new()
                        .with_data(text.into_bytes())
                        .with_note(if little_endian {
                            "transcoded from UTF-16LE"
                        } else {
                            "transcoded from UTF-16BE"
                        }),
                ),
                None => FixOutcome::declined("malformed UTF-16 content"),
            }
        }
        Detected::Unknown(_) => {
            FixOutcome::declined("unrecognized encoding; convert the file to UTF-8")
        }
    };
    Ok(outcome)
}

pub fn rule() -> RecipeRule {
    RecipeRule::new(
        Recipe::new(NAME)
            .with_validate(validate)
            .with_fix(fix)
            .pass_message("UTF-8")
            .fixed_message("converted to UTF-8")
            .still_bad_message("encoding still invalid")
            .status_after_fix(Status::Pass),
    )
    .with_fail_fast(true)
    .with_priority(PRIORITY)
}
