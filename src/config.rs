use crate::error::Error;
use crate::geometry::{DualLines, LineSet, Point};
use crate::stats::RollupPolicy;

use serde_derive::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CounterConfig {
    pub lines: LinesConfig,
    pub detector: DetectorConfig,
    pub pipeline: PipelineConfig,
    pub statistics: StatisticsConfig,
}

impl CounterConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, Error> {
        Ok(toml::from_str(src)?)
    }

    /// A missing file is not an error, it yields the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

/// Starting line configuration. Without explicit values the dual lines sit
/// at one and two thirds of `frame_height`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LinesConfig {
    pub frame_height: i32,
    pub line_in_y: Option<i32>,
    pub line_out_y: Option<i32>,
    /// `[[x, y], ...]`; when present the polyline is active
    pub polyline: Option<Vec<[i32; 2]>>,
}

impl Default for LinesConfig {
    fn default() -> Self {
        Self {
            frame_height: 720,
            line_in_y: None,
            line_out_y: None,
            polyline: None,
        }
    }
}

impl LinesConfig {
    pub fn dual(&self) -> DualLines {
        let default = DualLines::for_height(self.frame_height);

        DualLines::new(
            self.line_in_y.unwrap_or(default.line_in_y),
            self.line_out_y.unwrap_or(default.line_out_y),
        )
    }

    pub fn line_set(&self) -> LineSet {
        match &self.polyline {
            Some(points) => LineSet::Polyline(
                points.iter().map(|&[x, y]| Point::new(x, y)).collect(),
            ),
            None => LineSet::Dual(self.dual()),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Only tracks of this class are counted, 0 is "person"
    pub class: i32,
    pub max_missed_frames: Option<u64>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            class: 0,
            max_missed_frames: Some(300),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub queue_capacity: Option<usize>,
    pub write_timeout_ms: Option<u64>,
}

impl PipelineConfig {
    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StatisticsConfig {
    pub policy: RollupPolicy,
}
