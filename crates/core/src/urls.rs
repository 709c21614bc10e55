use crate::SourceKind;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

pub fn track_url(source: SourceKind, id: &str) -> String {
    let encoded = utf8_percent_encode(id, NON_ALPHANUMERIC).to_string();
    match source {
        SourceKind::YouTube => format!("https://www.youtube.com/watch?v={encoded}"),
        SourceKind::SoundCloud => format!("https://api.soundcloud.com/tracks/{encoded}"),
    }
}
