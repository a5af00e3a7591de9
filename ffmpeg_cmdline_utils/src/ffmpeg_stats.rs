use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::*;

#[derive(Debug, Deserialize, Serialize, Clone, Error)]
pub enum VideoInfoError {
    #[error("Error parsing stats: {0}")]
    JsonError(String),
    #[error("Error parsing stats: {0}")]
    ParseIntError(String),
    #[error("Error parsing stats: {0}")]
    ParseFloatError(String),
    #[error("Unexpected video rotation: {0}")]
    Rotation(String),
}

impl From<serde_json::Error> for VideoInfoError {
    fn from(e: serde_json::Error) -> Self {
        //limit maximum number of characters
        let error_string = format!("{e}").chars().take(500).collect::<String>();
        VideoInfoError::JsonError(error_string)
    }
}

impl From<std::num::ParseIntError> for VideoInfoError {
    fn from(e: std::num::ParseIntError) -> Self {
        VideoInfoError::ParseIntError(format!("{e}"))
    }
}

impl From<std::num::ParseFloatError> for VideoInfoError {
    fn from(e: std::num::ParseFloatError) -> Self {
        VideoInfoError::ParseFloatError(format!("{e}"))
    }
}

// If the video metadata declares a rotation, the raw (x, y) resolution in that metadata
// refers to the "unrotated" resolution. Ffmpeg autorotates each decoded frame, so x and y
// must be swapped when the rotation is 90 or 270.
#[derive(PartialEq, Eq, Clone, Debug, Copy, Default)]
enum Rotation {
    #[default]
    Rot0,
    Rot90,
    Rot180,
    Rot270,
}

impl Rotation {
    fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Rot0),
            90 => Some(Self::Rot90),
            180 => Some(Self::Rot180),
            270 => Some(Self::Rot270),
            _ => None,
        }
    }

    fn swaps_axes(self) -> bool {
        matches!(self, Self::Rot90 | Self::Rot270)
    }
}

/// Some of the video metadata that can be obtained by using ffprobe.
#[derive(PartialEq, Eq, Clone, Debug, Serialize, Deserialize, Default)]
pub struct VideoInfo {
    duration: Duration,
    file_size: u64,
    resolution: (u32, u32),
}

impl VideoInfo {
    /// Use ffprobe to get the duration and resolution of a video. If the video contains multiple
    /// streams then only information about the first video stream is returned.
    ///
    /// # Errors
    /// * The file cannot be read or is not recognized as a media file by ffprobe
    /// * The output from ffprobe could not be parsed as JSON
    pub fn new<P>(src_path: P) -> Result<Self, FfmpegError>
    where
        P: AsRef<Path>,
    {
        let stats_string = crate::ffmpeg_ops::get_video_stats(&src_path)?;
        let info = Self::from_ffprobe_json(&stats_string)?;
        Ok(info)
    }

    /// Parse the output of `ffprobe -show_format -show_streams -print_format json`.
    pub fn from_ffprobe_json(stats_string: &str) -> Result<Self, VideoInfoError> {
        let stats_parsed: Value = serde_json::from_str(stats_string)?;

        let duration = match &stats_parsed["format"]["duration"] {
            Value::String(d) => {
                let secs: f64 = d.parse()?;
                Duration::try_from_secs_f64(secs).unwrap_or_default()
            }
            _ => Duration::ZERO,
        };

        let file_size = match &stats_parsed["format"]["size"] {
            Value::String(s) => s.parse()?,
            _ => 0,
        };

        let rotation = match Self::first_video(&stats_parsed).and_then(Self::rotation_value) {
            None => Rotation::Rot0,
            Some(rotation) => {
                // The rotation may either be a JSON String or a JSON number.
                let degrees = match &rotation {
                    Value::Number(val) => val.as_i64(),
                    Value::String(val) => val.parse::<i64>().ok(),
                    _ => None,
                };

                degrees
                    .and_then(Rotation::from_degrees)
                    .ok_or_else(|| VideoInfoError::Rotation(rotation.to_string()))?
            }
        };

        let resolution = {
            let first_width = Self::first_vid_u32(&stats_parsed, "width").unwrap_or(0);
            let first_height = Self::first_vid_u32(&stats_parsed, "height").unwrap_or(0);

            if rotation.swaps_axes() {
                (first_height, first_width)
            } else {
                (first_width, first_height)
            }
        };

        Ok(VideoInfo {
            duration,
            file_size,
            resolution,
        })
    }

    /// The duration of the video. Zero if ffprobe could not determine it.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The size of the video in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// The resolution of the video in pixels, in the orientation that the video is intended to be viewed.
    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn rotation_value(video_stream: &Value) -> Option<Value> {
        video_stream
            .get("side_data_list")
            .and_then(|side_data| side_data.get(0))
            .and_then(|first| first.get("rotation").cloned())
    }

    fn first_video(stats_parsed: &Value) -> Option<&Value> {
        Self::streams_of_type(stats_parsed, "video").and_then(|videos| videos.into_iter().next())
    }

    fn streams_of_type<'a>(stats_parsed: &'a Value, stream_type: &str) -> Option<Vec<&'a Value>> {
        if let Value::Array(streams) = &stats_parsed["streams"] {
            let ret = streams
                .iter()
                .filter(|s| match &s["codec_type"] {
                    Value::String(codec_type) => codec_type == stream_type,
                    _ => false,
                })
                .collect();

            Some(ret)
        } else {
            None
        }
    }

    fn first_vid_u32(stats_parsed: &Value, field_name: &str) -> Option<u32> {
        Self::streams_of_type(stats_parsed, "video")?
            .iter()
            .find_map(|stream| stream[field_name].as_u64())
            .and_then(|v| u32::try_from(v).ok())
    }
}
