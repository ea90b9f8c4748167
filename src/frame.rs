use crate::track::Track;
use chrono::NaiveDateTime;
use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Frame {
    #[serde(rename = "ts")]
    pub timestamp: NaiveDateTime,
    pub tracks: Vec<Track>,
}

impl Frame {
    pub fn new(timestamp: NaiveDateTime, tracks: Vec<Track>) -> Self {
        Self { timestamp, tracks }
    }

    /// Confirmed tracks of a single class, in tracker order
    pub fn tracks_of_class(&self, class: i32) -> impl Iterator<Item = &Track> {
        self.tracks
            .iter()
            .filter(move |t| t.confirmed && t.class == class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_line() {
        let line = r#"{"ts":"2024-06-10T08:30:00","tracks":[
            {"id":3,"bbox":[0.0,80.0,20.0,100.0]},
            {"id":4,"confirmed":false,"bbox":[0.0,0.0,2.0,2.0]},
            {"id":5,"c":2,"bbox":[0.0,0.0,2.0,2.0]}
        ]}"#;
        let frame: Frame = serde_json::from_str(line).unwrap();

        assert_eq!(frame.tracks.len(), 3);
        let ids: Vec<_> = frame.tracks_of_class(0).map(|t| t.track_id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn empty_frame() {
        let ts = NaiveDateTime::parse_from_str("2024-06-10 08:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let frame = Frame::new(ts, vec![]);

        assert!(frame.tracks.is_empty());
        assert_eq!(frame.tracks_of_class(0).count(), 0);
    }
}
