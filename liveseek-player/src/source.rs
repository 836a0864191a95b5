//! Stream source building
//!
//! A live stream is re-acquired instead of seeked: every seek, rate change and
//! reconnect asks the server for a new stream through query parameters on the
//! base URL returned by the stream URL provider.
//!
//! | parameter  | meaning                                       |
//! |------------|-----------------------------------------------|
//! | `speed`    | playback speed the server should encode for   |
//! | `keyIndex` | keyframe-density tier (0 below 4x, 1 from 4x) |
//! | `offset`   | start offset in milliseconds                  |

use crate::error::{Error, Result};
use liveseek_common::time::seconds_to_millis;
use url::Url;

/// Speed at which the server switches to the sparse keyframe tier
pub const SPARSE_KEYFRAME_SPEED: f64 = 4.0;

/// Container MIME types this controller can drive
pub const SUPPORTED_MIME_TYPES: [&str; 3] = ["video/iotx-flv", "video/flv", "video/x-flv"];

const MANAGED_PARAMS: [&str; 3] = ["speed", "keyIndex", "offset"];

/// Server-selected keyframe-density tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIndex {
    /// Regular keyframe density (speed below 4x)
    Full = 0,
    /// Sparse keyframes for fast playback (4x and above)
    Sparse = 1,
}

impl KeyIndex {
    pub fn for_speed(speed: f64) -> Self {
        if speed < SPARSE_KEYFRAME_SPEED {
            KeyIndex::Full
        } else {
            KeyIndex::Sparse
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Playback parameters for a re-acquisition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackParams {
    pub speed: f64,
    pub offset_seconds: f64,
}

impl PlaybackParams {
    pub fn new(speed: f64, offset_seconds: f64) -> Self {
        Self {
            speed,
            offset_seconds,
        }
    }
}

/// An immutable description of one stream acquisition
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    base_url: String,
    speed: f64,
    key_index: KeyIndex,
    offset_ms: u64,
    url: Url,
}

impl StreamDescriptor {
    /// Build a descriptor (and its request URL) from a base URL
    pub fn build(base_url: &str, params: PlaybackParams) -> Result<Self> {
        let url = build_stream_url(base_url, params)?;
        Ok(Self {
            base_url: base_url.to_string(),
            speed: params.speed,
            key_index: KeyIndex::for_speed(params.speed),
            offset_ms: seconds_to_millis(params.offset_seconds),
            url,
        })
    }

    /// Descriptor for a plain load: the URL is used exactly as given
    pub fn unmodified(url: &str) -> Result<Self> {
        let parsed = parse_base(url)?;
        Ok(Self {
            base_url: url.to_string(),
            speed: 1.0,
            key_index: KeyIndex::Full,
            offset_ms: 0,
            url: parsed,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn key_index(&self) -> KeyIndex {
        self.key_index
    }

    pub fn offset_ms(&self) -> u64 {
        self.offset_ms
    }

    /// Offset in seconds on the virtual timeline
    pub fn offset_seconds(&self) -> f64 {
        self.offset_ms as f64 / 1000.0
    }

    /// Full request URL
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Merge `speed`, `keyIndex` and `offset` into `base_url`
///
/// Existing parameters with those names are replaced; every other query
/// segment is kept byte-for-byte in its original order. Applying the function
/// to its own output with the same parameters yields the same URL.
pub fn build_stream_url(base_url: &str, params: PlaybackParams) -> Result<Url> {
    let mut url = parse_base(base_url)?;

    let mut segments: Vec<String> = url
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| {
            let name = segment.split('=').next().unwrap_or("");
            !MANAGED_PARAMS.contains(&name)
        })
        .map(str::to_string)
        .collect();

    segments.push(format!("speed={}", format_speed(params.speed)));
    segments.push(format!("keyIndex={}", KeyIndex::for_speed(params.speed).as_u8()));
    segments.push(format!("offset={}", seconds_to_millis(params.offset_seconds)));

    url.set_query(Some(&segments.join("&")));
    Ok(url)
}

/// True for container types this controller is built for
pub fn supports_mime_type(mime_type: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&mime_type)
}

fn parse_base(base_url: &str) -> Result<Url> {
    Url::parse(base_url).map_err(|source| Error::InvalidUrl {
        url: base_url.to_string(),
        source,
    })
}

// 1.0 -> "1", 1.5 -> "1.5"
fn format_speed(speed: f64) -> String {
    format!("{}", speed)
}
