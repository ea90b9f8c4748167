use crate::bbox::{BBox, Ltrb};
use serde_derive::{Deserialize, Serialize};

pub type TrackId = i32;

/// One row of tracker output for a single frame
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Track {
    #[serde(rename = "id")]
    pub track_id: TrackId,
    #[serde(default = "confirmed_by_default")]
    pub confirmed: bool,
    #[serde(rename = "c", default)]
    pub class: i32,
    pub bbox: BBox<Ltrb>,
}

fn confirmed_by_default() -> bool {
    true
}

impl Track {
    pub fn new(track_id: TrackId, class: i32, bbox: BBox<Ltrb>) -> Self {
        Self {
            track_id,
            confirmed: true,
            class,
            bbox,
        }
    }
}
