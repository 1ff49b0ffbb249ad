use crate::api::model::{SavedTrack, TrackInfo};

/// `m:ss`, seconds rounded to the nearest whole second.
pub fn format_duration(ms: f64) -> String {
    let total = (ms.max(0.0) / 1000.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Cut `text` to `limit` characters, marking the cut with "...".
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let mut cut: String = text.chars().take(limit).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

/// One table row per saved track: date added, title, artist, album, length.
pub fn format_saved(tracks: &[SavedTrack]) -> Vec<String> {
    tracks
        .iter()
        .map(|saved| {
            let info = TrackInfo::from(&saved.track);
            let album = saved
                .track
                .album
                .as_ref()
                .map(|album| album.name.as_str())
                .unwrap_or_default();
            format!(
                "{:<10}  {:<44}  {:<19}  {:<19}  {:>5}",
                saved.added_at.get(..10).unwrap_or(&saved.added_at),
                truncate(&info.name, 41),
                truncate(&info.artist, 16),
                truncate(album, 16),
                format_duration(info.duration_ms)
            )
        })
        .collect()
}
